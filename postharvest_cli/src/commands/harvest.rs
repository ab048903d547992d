//! Shared driver for the three collection subcommands: configuration
//! loading, flag overrides, and the interruptible session run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use postharvest_lib::{Backend, HarvestConfig, HarvestSession, PostSource, QuerySpec};
use tracing::{error, info, warn};

use crate::output::{print_run, OutputFormat};

/// Flags common to every collection backend. Each one overrides the
/// configuration file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Directory for the JSONL output files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Stop a query after this many new posts
    #[arg(long)]
    pub max_posts: Option<usize>,

    /// Stop a query after this many iterations
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Consecutive iterations without a new post before giving up on a query
    #[arg(long)]
    pub stall_threshold: Option<usize>,

    /// Pause between advancing the source and collecting, in milliseconds
    #[arg(long)]
    pub pacing_ms: Option<u64>,

    /// Pause between queries, in milliseconds
    #[arg(long)]
    pub query_delay_ms: Option<u64>,

    /// Run this single query instead of the configured list
    #[arg(long)]
    pub query: Option<String>,

    /// Label (and output file stem) for --query
    #[arg(long, requires = "query")]
    pub label: Option<String>,

    /// Number of top posts to list after the run
    #[arg(long, default_value = "10")]
    pub top: usize,
}

impl RunArgs {
    pub fn apply(&self, config: &mut HarvestConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(n) = self.max_posts {
            config.max_posts_per_query = Some(n);
        }
        if let Some(n) = self.max_iterations {
            config.max_iterations = Some(n);
        }
        if let Some(n) = self.stall_threshold {
            config.stall_threshold = n;
        }
        if let Some(ms) = self.pacing_ms {
            config.pacing_ms = ms;
        }
        if let Some(ms) = self.query_delay_ms {
            config.query_delay_ms = ms;
        }
        if let Some(query) = &self.query {
            let label = self.label.clone().unwrap_or_else(|| query.clone());
            config.queries = vec![QuerySpec::new(query.clone(), label)];
        }
    }
}

/// File (or defaults), then environment.
pub fn load_config(path: Option<&Path>) -> Result<HarvestConfig> {
    let mut config = match path {
        Some(path) => HarvestConfig::load(path)?,
        None => HarvestConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

/// Runs every configured query through `source`. Ctrl-C abandons the
/// current query; the session is closed on every path and run errors are
/// logged rather than returned.
pub async fn run_session(
    source: Box<dyn PostSource>,
    config: &HarvestConfig,
    backend: Backend,
    top: usize,
    format: &OutputFormat,
) -> Result<()> {
    let total = config.queries.len();
    info!("running {} queries with the {} backend", total, backend);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {msg}",
    )?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("0/{} queries, 0 new posts", total));

    let pb = spinner.clone();
    let mut finished = 0usize;
    let mut new_posts = 0usize;
    let mut session = HarvestSession::new(source, config.output_layout(backend), config.loop_config(backend))
        .with_query_delay(config.query_delay())
        .on_query_finished(move |outcome| {
            finished += 1;
            new_posts += outcome.new_records;
            pb.set_message(format!(
                "{}/{} queries, {} new posts (last: {}, {})",
                finished, total, new_posts, outcome.label, outcome.stop_reason
            ));
        });

    let result = tokio::select! {
        res = session.run(&config.queries) => Some(res),
        _ = tokio::signal::ctrl_c() => None,
    };
    session.close().await;
    spinner.finish_and_clear();

    match result {
        Some(Ok(summary)) => {
            let failed = summary.failed_queries();
            if failed > 0 {
                warn!("{} of {} queries failed", failed, total);
            }
            print_run(&summary, top, format)?;
        }
        Some(Err(e)) => error!("run failed: {}", e),
        None => warn!("interrupted, output written so far is kept"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let mut config = HarvestConfig::default();
        let args = RunArgs {
            output_dir: Some(PathBuf::from("out")),
            max_posts: Some(15),
            stall_threshold: Some(6),
            pacing_ms: Some(250),
            query: Some("budget -is:retweet".to_string()),
            ..Default::default()
        };
        args.apply(&mut config);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.max_posts_per_query, Some(15));
        assert_eq!(config.stall_threshold, 6);
        assert_eq!(config.pacing_ms, 250);
        assert_eq!(config.queries, vec![QuerySpec::new("budget -is:retweet", "budget -is:retweet")]);

        let loop_config = config.loop_config(Backend::ApiClient);
        assert_eq!(loop_config.target, 15);
        assert_eq!(loop_config.pacing, Duration::from_millis(250));
    }

    #[test]
    fn no_flags_keep_config() {
        let mut config = HarvestConfig::default();
        RunArgs::default().apply(&mut config);
        assert_eq!(config, HarvestConfig::default());
    }
}
