//! Error types for the library layer.

use std::fmt;

/// Errors produced by the library layer, wrapping backend errors and adding
/// file, configuration, and input validation failures.
#[derive(Debug)]
pub enum HarvestError {
    /// Reading or writing an output, dedup, or config file failed.
    Io(std::io::Error),
    /// JSON serialization or deserialization failed.
    Serialization(serde_json::Error),
    /// A configuration file could not be parsed.
    Config(String),
    /// User-provided input failed validation.
    InvalidInput(String),
    /// A required credential was not supplied.
    MissingCredential(&'static str),
    /// An error from the official API client.
    Api(xsearch_api::Error),
    /// An error from the search-timeline scraper.
    Search(crate::search::SearchError),
    /// The headless browser could not be launched or driven.
    Browser(String),
}

impl fmt::Display for HarvestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Config(msg) => write!(f, "Config error: {}", msg),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::MissingCredential(name) => write!(f, "Missing credential: {} is not set", name),
            Self::Api(e) => write!(f, "API error: {}", e),
            Self::Search(e) => write!(f, "Search error: {}", e),
            Self::Browser(msg) => write!(f, "Browser error: {}", msg),
        }
    }
}

impl std::error::Error for HarvestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::Api(e) => Some(e),
            Self::Search(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HarvestError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<xsearch_api::Error> for HarvestError {
    fn from(e: xsearch_api::Error) -> Self {
        Self::Api(e)
    }
}

impl From<crate::search::SearchError> for HarvestError {
    fn from(e: crate::search::SearchError) -> Self {
        Self::Search(e)
    }
}
