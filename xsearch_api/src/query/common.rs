//! Shared query infrastructure: the [`Query`] trait and [`QueryCommon`] fields.

use chrono::{DateTime, SecondsFormat, Utc};
use url::Url;

/// Trait implemented by all query builders. Provides URL serialization and
/// shared builder methods for page size, pagination tokens, and time bounds.
pub trait Query {
    /// Appends this query's parameters to the given URL, returning the modified URL.
    fn add_to_url(&self, url: &Url) -> Url;

    /// Returns a mutable reference to the common query fields.
    fn get_common(&mut self) -> &mut QueryCommon;

    /// Sets the number of results per page (the endpoint accepts 10-100).
    fn with_max_results(mut self, max_results: u32) -> Self
    where
        Self: Sized,
    {
        self.get_common().max_results = Some(max_results);
        self
    }

    /// Continues from the `next_token` returned by a previous page.
    fn with_next_token(mut self, next_token: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.get_common().next_token = Some(next_token.into());
        self
    }

    /// Only return posts created at or after this instant.
    fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self
    where
        Self: Sized,
    {
        self.get_common().start_time = Some(start_time);
        self
    }

    /// Only return posts created before this instant.
    fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self
    where
        Self: Sized,
    {
        self.get_common().end_time = Some(end_time);
        self
    }
}

/// Fields shared by all query types: page size, pagination token, and time window.
#[derive(Clone, Debug, Default)]
pub struct QueryCommon {
    /// Results per page. `None` uses the API default (10).
    pub max_results: Option<u32>,
    /// Opaque token for the next page.
    pub next_token: Option<String>,
    /// Inclusive lower bound on creation time.
    pub start_time: Option<DateTime<Utc>>,
    /// Exclusive upper bound on creation time.
    pub end_time: Option<DateTime<Utc>>,
}

impl QueryCommon {
    /// Appends the common pagination and time parameters to the URL.
    pub fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        if let Some(max_results) = self.max_results {
            url.query_pairs_mut()
                .append_pair("max_results", &max_results.to_string());
        };
        if let Some(start_time) = self.start_time {
            url.query_pairs_mut().append_pair(
                "start_time",
                &start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        };
        if let Some(end_time) = self.end_time {
            url.query_pairs_mut().append_pair(
                "end_time",
                &end_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        };
        if let Some(next_token) = &self.next_token {
            url.query_pairs_mut().append_pair("next_token", next_token);
        };
        url
    }
}
