//! HTTP client for the guest-token search timeline.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

use xsearch_api::user_agent::get_user_agent;

use super::error::SearchError;
use super::types::{AdaptiveResponse, GuestActivation, SearchPage};

pub struct SearchScrapeClient {
    base_url: String,
    http: reqwest::Client,
    web_bearer: String,
    guest_token: Option<String>,
}

impl SearchScrapeClient {
    pub fn new(web_bearer: impl Into<String>) -> Result<Self, SearchError> {
        Self::with_base_url("https://api.x.com", web_bearer)
    }

    pub fn with_base_url(base_url: &str, web_bearer: impl Into<String>) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            web_bearer: web_bearer.into(),
            guest_token: None,
        })
    }

    async fn activate(&mut self) -> Result<String, SearchError> {
        let url = format!("{}/1.1/guest/activate.json", self.base_url);
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.web_bearer)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SearchError::GuestToken(format!("status {}", resp.status())));
        }
        let activation: GuestActivation = resp.json().await?;
        debug!("activated guest token");
        self.guest_token = Some(activation.guest_token.clone());
        Ok(activation.guest_token)
    }

    async fn guest_token(&mut self) -> Result<String, SearchError> {
        match &self.guest_token {
            Some(token) => Ok(token.clone()),
            None => self.activate().await,
        }
    }

    /// Fetches one page of results. An expired guest token is replaced once.
    pub async fn search_page(
        &mut self,
        query: &str,
        cursor: Option<&str>,
        count: u32,
    ) -> Result<SearchPage, SearchError> {
        match self.fetch_page(query, cursor, count).await {
            Err(SearchError::HttpStatus { status })
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
            {
                warn!("guest token rejected with status {}, reactivating", status);
                self.guest_token = None;
                self.fetch_page(query, cursor, count).await
            }
            other => other,
        }
    }

    async fn fetch_page(
        &mut self,
        query: &str,
        cursor: Option<&str>,
        count: u32,
    ) -> Result<SearchPage, SearchError> {
        let token = self.guest_token().await?;
        let url = format!("{}/2/search/adaptive.json", self.base_url);
        let count = count.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("q", query),
            ("tweet_search_mode", "live"),
            ("count", count.as_str()),
            ("query_source", "typed_query"),
            ("tweet_mode", "extended"),
            ("include_quote_count", "true"),
            ("include_reply_count", "1"),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }

        let resp = self
            .http
            .get(url)
            .query(&params)
            .bearer_auth(&self.web_bearer)
            .header("x-guest-token", token)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            return Err(SearchError::HttpStatus { status });
        }
        let body = resp.text().await?;
        let parsed: AdaptiveResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_page())
    }
}

/// Appends the date operators to a query.
pub fn build_search_query(query: &str, since: &str, until: Option<&str>) -> String {
    match until {
        Some(until) => format!("{} since:{} until:{}", query, since, until),
        None => format!("{} since:{}", query, since),
    }
}
