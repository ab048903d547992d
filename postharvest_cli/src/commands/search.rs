use std::path::Path;

use anyhow::Result;
use clap::Args;
use postharvest_lib::config::{credential, ENV_WEB_BEARER};
use postharvest_lib::{Backend, SearchOptions, SearchScrapeClient, SearchSource};
use tracing::error;

use super::harvest::{load_config, run_session, RunArgs};
use crate::output::OutputFormat;

#[derive(Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Earliest post date, YYYY-MM-DD
    #[arg(long)]
    pub since: Option<String>,

    /// Latest post date (exclusive), YYYY-MM-DD
    #[arg(long)]
    pub until: Option<String>,

    /// Allowed language tags, comma-separated (e.g. zh,en)
    #[arg(long, value_delimiter = ',')]
    pub lang: Vec<String>,

    /// Posts requested per timeline page
    #[arg(long)]
    pub page_size: Option<u32>,
}

pub async fn run(args: &SearchArgs, config_path: Option<&Path>, format: &OutputFormat) -> Result<()> {
    let mut config = load_config(config_path)?;
    args.run.apply(&mut config);

    if let Some(since) = &args.since {
        config.search.since = since.clone();
    }
    if let Some(until) = &args.until {
        config.search.until = Some(until.clone());
    }
    if !args.lang.is_empty() {
        config.search.languages = args.lang.clone();
    }
    if let Some(n) = args.page_size {
        config.search.page_size = n;
    }
    config.validate()?;

    let bearer = match credential(ENV_WEB_BEARER) {
        Ok(token) => token,
        Err(e) => {
            error!("{}", e);
            return Ok(());
        }
    };

    let client = SearchScrapeClient::with_base_url(&config.search.base_url, bearer)?;
    let options = SearchOptions {
        since: config.search.since.clone(),
        until: config.search.until.clone(),
        languages: config.search.languages.clone(),
        page_size: config.search.page_size,
    };
    let source = SearchSource::new(client, options);
    run_session(Box::new(source), &config, Backend::SearchLibrary, args.run.top, format).await
}
