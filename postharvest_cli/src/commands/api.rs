use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use postharvest_lib::config::{credential, ENV_API_BEARER};
use postharvest_lib::validation::validate_date;
use postharvest_lib::xsearch_api::Client;
use postharvest_lib::{ApiOptions, ApiSource, Backend};
use tracing::error;

use super::harvest::{load_config, run_session, RunArgs};
use crate::output::OutputFormat;

#[derive(Args)]
pub struct ApiArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Results per request, 10 to 100
    #[arg(long)]
    pub max_results: Option<u32>,

    /// Lower time bound, RFC 3339 or YYYY-MM-DD. Ignored when older than seven days
    #[arg(long)]
    pub start_time: Option<String>,

    /// Fail the query on a rate limit instead of waiting for the reset
    #[arg(long)]
    pub no_wait: bool,
}

/// Accepts a full RFC 3339 instant or a bare date (midnight UTC).
fn parse_start_time(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = validate_date(raw)?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("invalid start time '{}'", raw))?;
    Ok(midnight.and_utc())
}

pub async fn run(args: &ApiArgs, config_path: Option<&Path>, format: &OutputFormat) -> Result<()> {
    let mut config = load_config(config_path)?;
    args.run.apply(&mut config);

    if let Some(n) = args.max_results {
        config.api.max_results = n;
    }
    if let Some(start) = &args.start_time {
        config.api.start_time = Some(start.clone());
    }
    if args.no_wait {
        config.api.wait_on_rate_limit = false;
    }
    config.validate()?;

    let start_time = config
        .api
        .start_time
        .as_deref()
        .map(parse_start_time)
        .transpose()?;

    let token = match credential(ENV_API_BEARER) {
        Ok(token) => token,
        Err(e) => {
            error!("{}", e);
            return Ok(());
        }
    };

    let client = Client::with_base_url(&config.api.base_url, token);
    let options = ApiOptions {
        max_results: config.api.max_results,
        start_time,
        wait_on_rate_limit: config.api.wait_on_rate_limit,
    };
    let source = ApiSource::new(client, options);
    run_session(Box::new(source), &config, Backend::ApiClient, args.run.top, format).await
}
