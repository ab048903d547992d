//! Library layer for postharvest: post collection from a search interface
//! through three backends, JSONL persistence with cross-run dedup, and
//! engagement reporting.
//!
//! Wraps the `xsearch_api` crate for the official API backend and adds the
//! browser and search-timeline backends, the pagination loop, and the
//! per-run session.

pub mod api;
pub mod browser;
pub mod config;
pub mod dedup;
pub mod engagement;
pub mod error;
pub mod extract;
pub mod numbers;
pub mod pagination;
pub mod record;
pub mod runner;
pub mod search;
pub mod sink;
pub mod source;
pub mod validation;

pub use xsearch_api;

pub use api::{ApiOptions, ApiSource};
pub use browser::BrowserSource;
pub use config::HarvestConfig;
pub use dedup::{DedupIndex, LoadStats};
pub use engagement::{engagement_score, rank_by_engagement, summarize, top_n, Summary};
pub use error::HarvestError;
pub use extract::{extract_post, ExtractContext};
pub use numbers::parse_count;
pub use pagination::{run_pagination, LoopConfig, LoopOutcome, StopReason};
pub use record::{Backend, IdentityKey, PostRecord, QuerySpec, TextRecord};
pub use runner::{HarvestSession, OutputLayout, QueryOutcome, RunSummary};
pub use search::{SearchError, SearchOptions, SearchScrapeClient, SearchSource};
pub use sink::JsonlSink;
pub use source::{Advance, ItemOutcome, PostSource, SourceError};
