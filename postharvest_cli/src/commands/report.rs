use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use postharvest_lib::engagement::{dedup_records, load_records};
use postharvest_lib::{summarize, top_n};
use tracing::info;

use crate::output::{print_report, OutputFormat};

#[derive(Args)]
pub struct ReportArgs {
    /// Raw JSONL files to read. Posts repeated across files are counted once
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Number of top posts by engagement to list
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Number of languages to list in the summary
    #[arg(long, default_value = "5")]
    pub langs: usize,
}

pub fn run(args: &ReportArgs, format: &OutputFormat) -> Result<()> {
    let mut records = Vec::new();
    for path in &args.files {
        let loaded = load_records(path).with_context(|| format!("failed to read {}", path.display()))?;
        info!("{}: {} records", path.display(), loaded.len());
        records.extend(loaded);
    }
    let records = dedup_records(records);

    let summary = summarize(&records, args.langs);
    let top = top_n(&records, args.top);
    print_report(&summary, &top, format)
}
