use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Args;
use postharvest_lib::config::SearchTab;
use postharvest_lib::{Backend, BrowserSource};
use tracing::error;

use super::harvest::{load_config, run_session, RunArgs};
use crate::output::OutputFormat;

#[derive(Args)]
pub struct BrowserArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Run Chromium without a window
    #[arg(long)]
    pub headless: bool,

    /// Chromium executable (default: CHROME_EXECUTABLE, then auto-detect)
    #[arg(long)]
    pub chrome: Option<String>,

    /// Existing profile directory with a logged-in session
    #[arg(long)]
    pub profile_dir: Option<PathBuf>,

    /// Results tab: top, latest, people, media
    #[arg(long)]
    pub tab: Option<String>,

    /// Scrolls per iteration
    #[arg(long)]
    pub scrolls: Option<usize>,

    /// Pause after each scroll, in milliseconds
    #[arg(long)]
    pub scroll_pause_ms: Option<u64>,
}

fn parse_tab(tab: &str) -> Result<SearchTab> {
    Ok(match tab.to_ascii_lowercase().as_str() {
        "top" => SearchTab::Top,
        "latest" | "live" => SearchTab::Latest,
        "people" | "user" => SearchTab::People,
        "media" => SearchTab::Media,
        other => bail!("unknown search tab '{}' (expected top, latest, people, media)", other),
    })
}

pub async fn run(args: &BrowserArgs, config_path: Option<&Path>, format: &OutputFormat) -> Result<()> {
    let mut config = load_config(config_path)?;
    args.run.apply(&mut config);

    if args.headless {
        config.browser.headless = true;
    }
    if let Some(chrome) = &args.chrome {
        config.browser.chrome_executable = Some(chrome.clone());
    }
    if let Some(dir) = &args.profile_dir {
        config.browser.profile_dir = Some(dir.clone());
    }
    if let Some(tab) = &args.tab {
        config.browser.search_tab = parse_tab(tab)?;
    }
    if let Some(n) = args.scrolls {
        config.browser.scrolls_per_iteration = n;
    }
    if let Some(ms) = args.scroll_pause_ms {
        config.browser.scroll_pause_ms = ms;
    }
    config.validate()?;

    let source = match BrowserSource::launch(config.browser.clone()).await {
        Ok(source) => source,
        Err(e) => {
            error!("could not start the browser: {}", e);
            return Ok(());
        }
    };
    run_session(Box::new(source), &config, Backend::Browser, args.run.top, format).await
}
