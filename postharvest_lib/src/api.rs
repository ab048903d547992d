//! Official recent-search backend.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};
use xsearch_api::types::{SearchResponse, Tweet, User};
use xsearch_api::{Client, Query, SearchQuery};

use crate::record::{Backend, PostRecord, QuerySpec};
use crate::source::{Advance, ItemOutcome, PostSource, SourceError};

/// The recent-search endpoint only covers the last seven days.
pub const RECENT_WINDOW_DAYS: i64 = 7;
pub const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub max_results: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub wait_on_rate_limit: bool,
}

/// `start` when it falls inside the recent-search window, otherwise `None`.
pub fn recent_start_time(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let start = start?;
    let window_open = now - chrono::Duration::days(RECENT_WINDOW_DAYS);
    if start >= window_open {
        Some(start)
    } else {
        info!("start_time {} is outside the recent window, ignoring", start);
        None
    }
}

/// How long to sleep for a rate-limit reset given as epoch seconds.
pub fn rate_limit_wait(reset: Option<i64>, now: DateTime<Utc>) -> Duration {
    match reset {
        Some(reset) => {
            let secs = (reset - now.timestamp()).max(0) as u64;
            Duration::from_secs(secs + 1).min(MAX_RATE_LIMIT_WAIT)
        }
        None => MAX_RATE_LIMIT_WAIT,
    }
}

fn to_record(tweet: &Tweet, author: Option<&User>, query: &str) -> PostRecord {
    let username = author.map(|u| u.username.clone()).unwrap_or_default();
    let url = if username.is_empty() {
        format!("https://x.com/i/web/status/{}", tweet.id)
    } else {
        format!("https://x.com/{}/status/{}", username, tweet.id)
    };
    let metrics = tweet.public_metrics.unwrap_or_default();
    PostRecord {
        id: tweet.numeric_id(),
        url: Some(url),
        username,
        display_name: author.map(|u| u.name.clone()).unwrap_or_default(),
        date: tweet
            .created_at
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default(),
        text: tweet.text.clone(),
        image: None,
        like_count: metrics.like_count,
        retweet_count: metrics.retweet_count,
        reply_count: Some(metrics.reply_count),
        quote_count: Some(metrics.quote_count),
        language: tweet.lang.clone(),
        hashtags: tweet.hashtags(),
        user_verified: author.and_then(|u| u.verified),
        user_followers: author
            .and_then(|u| u.public_metrics.as_ref())
            .map(|m| m.followers_count),
        author_id: tweet.author_id.clone(),
        query: query.to_string(),
        source: Backend::ApiClient,
    }
}

/// Joins each post with its author from `includes.users`.
pub fn response_records(resp: &SearchResponse, query: &str) -> Vec<PostRecord> {
    resp.data
        .iter()
        .map(|tweet| {
            let author = tweet.author_id.as_deref().and_then(|id| resp.user_by_id(id));
            to_record(tweet, author, query)
        })
        .collect()
}

pub struct ApiSource {
    client: Client,
    options: ApiOptions,
    query: Option<QuerySpec>,
    next_token: Option<String>,
    pending: Vec<PostRecord>,
    exhausted: bool,
}

impl ApiSource {
    pub fn new(client: Client, options: ApiOptions) -> Self {
        Self {
            client,
            options,
            query: None,
            next_token: None,
            pending: Vec::new(),
            exhausted: false,
        }
    }

    fn build_query(&self, text: &str) -> SearchQuery {
        let mut q = SearchQuery::new(text).with_max_results(self.options.max_results);
        if let Some(token) = &self.next_token {
            q = q.with_next_token(token.clone());
        }
        if let Some(start) = recent_start_time(self.options.start_time, Utc::now()) {
            q = q.with_start_time(start);
        }
        q
    }

    async fn fetch(&self, q: &SearchQuery) -> Result<SearchResponse, SourceError> {
        match self.client.search_recent(q).await {
            Err(xsearch_api::Error::RateLimited { reset }) if self.options.wait_on_rate_limit => {
                let wait = rate_limit_wait(reset, Utc::now());
                warn!("rate limited, sleeping {}s before retrying", wait.as_secs());
                tokio::time::sleep(wait).await;
                Ok(self.client.search_recent(q).await?)
            }
            other => Ok(other?),
        }
    }
}

#[async_trait]
impl PostSource for ApiSource {
    fn backend(&self) -> Backend {
        Backend::ApiClient
    }

    async fn begin(&mut self, query: &QuerySpec) -> Result<(), SourceError> {
        self.query = Some(query.clone());
        self.next_token = None;
        self.pending.clear();
        self.exhausted = false;
        Ok(())
    }

    async fn advance(&mut self) -> Result<Advance, SourceError> {
        let text = match &self.query {
            Some(q) => q.query.clone(),
            None => return Err(SourceError::NotStarted),
        };
        if self.exhausted {
            return Ok(Advance::Exhausted);
        }
        let q = self.build_query(&text);
        let resp = self.fetch(&q).await?;
        info!("fetched {} posts", resp.data.len());
        self.pending = response_records(&resp, &text);
        self.next_token = resp.meta.next_token;
        if self.next_token.is_none() {
            self.exhausted = true;
            return Ok(Advance::Exhausted);
        }
        Ok(Advance::More)
    }

    async fn collect(&mut self) -> Result<Vec<ItemOutcome>, SourceError> {
        Ok(std::mem::take(&mut self.pending)
            .into_iter()
            .map(|r| {
                if r.is_valid() {
                    ItemOutcome::Record(r)
                } else {
                    ItemOutcome::Failed(format!("post {:?} has no joined author or date", r.id))
                }
            })
            .collect())
    }

    async fn close(&mut self) {
        self.pending.clear();
        self.query = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn start_time_only_inside_window() {
        let recent = Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap();
        let old = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(recent_start_time(Some(recent), now()), Some(recent));
        assert_eq!(recent_start_time(Some(old), now()), None);
        assert_eq!(recent_start_time(None, now()), None);
    }

    #[test]
    fn rate_limit_wait_is_capped() {
        let n = now();
        assert_eq!(
            rate_limit_wait(Some(n.timestamp() + 30), n),
            Duration::from_secs(31)
        );
        assert_eq!(rate_limit_wait(Some(n.timestamp() - 5), n), Duration::from_secs(1));
        assert_eq!(rate_limit_wait(Some(n.timestamp() + 7200), n), MAX_RATE_LIMIT_WAIT);
        assert_eq!(rate_limit_wait(None, n), MAX_RATE_LIMIT_WAIT);
    }
}
