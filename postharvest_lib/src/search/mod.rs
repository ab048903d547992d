//! Search-library backend: guest-token access to the cursor-paged search
//! timeline.

mod client;
mod error;
mod source;
pub mod types;

pub use client::{build_search_query, SearchScrapeClient};
pub use error::SearchError;
pub use source::{SearchOptions, SearchSource};
