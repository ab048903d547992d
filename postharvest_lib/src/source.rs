//! The seam between the pagination loop and a concrete collector.

use async_trait::async_trait;

use crate::record::{Backend, PostRecord, QuerySpec};
use crate::search::SearchError;

/// A failure that ends collection for the current query.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("browser session failed: {0}")]
    Browser(String),
    #[error("api request failed: {0}")]
    Api(#[from] xsearch_api::Error),
    #[error("search request failed: {0}")]
    Search(#[from] SearchError),
    #[error("source used before begin()")]
    NotStarted,
    #[error("output write failed: {0}")]
    Sink(String),
}

/// Result of asking a source for more content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// More content may be available after this batch.
    More,
    /// The batch returned by the next `collect` is the last one.
    Exhausted,
}

/// Per-item result of a `collect` call.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Record(PostRecord),
    /// Routine skip: an ad, a partially rendered item, a filtered language.
    Skipped,
    /// Extraction of this one item failed; the loop continues.
    Failed(String),
}

/// One collector backend. A source is reused across queries: `begin` resets
/// it for a new query and `close` releases any external session.
#[async_trait]
pub trait PostSource: Send {
    fn backend(&self) -> Backend;

    async fn begin(&mut self, query: &QuerySpec) -> Result<(), SourceError>;

    /// Triggers more content (scroll, next page).
    async fn advance(&mut self) -> Result<Advance, SourceError>;

    /// Extracts every item currently available.
    async fn collect(&mut self) -> Result<Vec<ItemOutcome>, SourceError>;

    async fn close(&mut self);
}
