mod commands;
mod output;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "postharvest")]
#[command(about = "Collect posts from search results into JSON Lines files")]
struct Cli {
    /// Output format: table, json, csv, or markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Run configuration file (.toml, .yaml or .yml). Built-in queries are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also append log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scroll the search page in a Chromium browser and extract rendered posts
    Browser(Box<commands::browser::BrowserArgs>),
    /// Page the search timeline over HTTP with a guest token
    Search(commands::search::SearchArgs),
    /// Query the official recent-search API with a bearer token
    Api(commands::api::ApiArgs),
    /// Summarize and rank posts from raw JSONL files
    Report(commands::report::ReportArgs),
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("postharvest=info,postharvest_lib=info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let format = match cli.output.as_str() {
        "json" => OutputFormat::Json,
        "csv" => OutputFormat::Csv,
        "md" | "markdown" => OutputFormat::Markdown,
        _ => OutputFormat::Table,
    };
    let config = cli.config.as_deref();

    match &cli.command {
        Commands::Browser(args) => commands::browser::run(args.as_ref(), config, &format).await?,
        Commands::Search(args) => commands::search::run(args, config, &format).await?,
        Commands::Api(args) => commands::api::run(args, config, &format).await?,
        Commands::Report(args) => commands::report::run(args, &format)?,
    }

    Ok(())
}
