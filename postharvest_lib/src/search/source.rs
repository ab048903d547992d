use async_trait::async_trait;
use tracing::debug;

use crate::record::{Backend, PostRecord, QuerySpec};
use crate::source::{Advance, ItemOutcome, PostSource, SourceError};

use super::client::{build_search_query, SearchScrapeClient};
use super::types::SearchPost;

/// Date bounds, page size, and language allow-list for the search source.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub since: String,
    pub until: Option<String>,
    pub languages: Vec<String>,
    pub page_size: u32,
}

/// Walks the search timeline page by page, following the bottom cursor.
pub struct SearchSource {
    client: SearchScrapeClient,
    options: SearchOptions,
    query: Option<QuerySpec>,
    effective_query: String,
    cursor: Option<String>,
    pending: Vec<SearchPost>,
    exhausted: bool,
}

impl SearchSource {
    pub fn new(client: SearchScrapeClient, options: SearchOptions) -> Self {
        Self {
            client,
            options,
            query: None,
            effective_query: String::new(),
            cursor: None,
            pending: Vec::new(),
            exhausted: false,
        }
    }

    fn language_allowed(&self, lang: Option<&str>) -> bool {
        match lang {
            None => true,
            Some(_) if self.options.languages.is_empty() => true,
            Some(lang) => self.options.languages.iter().any(|l| l == lang),
        }
    }

    fn to_record(&self, post: SearchPost, query: &str) -> PostRecord {
        PostRecord {
            id: Some(post.id),
            url: Some(post.url()),
            username: post.username,
            display_name: post.display_name,
            date: post.date,
            text: post.text,
            image: post.image,
            like_count: post.like_count,
            retweet_count: post.retweet_count,
            reply_count: Some(post.reply_count),
            quote_count: Some(post.quote_count),
            language: post.lang,
            hashtags: post.hashtags,
            user_verified: Some(post.verified),
            user_followers: Some(post.followers),
            author_id: None,
            query: query.to_string(),
            source: Backend::SearchLibrary,
        }
    }
}

#[async_trait]
impl PostSource for SearchSource {
    fn backend(&self) -> Backend {
        Backend::SearchLibrary
    }

    async fn begin(&mut self, query: &QuerySpec) -> Result<(), SourceError> {
        self.effective_query = build_search_query(
            &query.query,
            &self.options.since,
            self.options.until.as_deref(),
        );
        debug!(query = %self.effective_query, "starting search");
        self.query = Some(query.clone());
        self.cursor = None;
        self.pending.clear();
        self.exhausted = false;
        Ok(())
    }

    async fn advance(&mut self) -> Result<Advance, SourceError> {
        if self.query.is_none() {
            return Err(SourceError::NotStarted);
        }
        if self.exhausted {
            return Ok(Advance::Exhausted);
        }
        let page = self
            .client
            .search_page(
                &self.effective_query,
                self.cursor.as_deref(),
                self.options.page_size,
            )
            .await?;

        let no_progress = page.posts.is_empty()
            || page.next_cursor.is_none()
            || page.next_cursor == self.cursor;
        self.pending = page.posts;
        if no_progress {
            self.exhausted = true;
            return Ok(Advance::Exhausted);
        }
        self.cursor = page.next_cursor;
        Ok(Advance::More)
    }

    async fn collect(&mut self) -> Result<Vec<ItemOutcome>, SourceError> {
        let query = match &self.query {
            Some(q) => q.query.clone(),
            None => return Err(SourceError::NotStarted),
        };
        let posts = std::mem::take(&mut self.pending);
        Ok(posts
            .into_iter()
            .map(|post| {
                if self.language_allowed(post.lang.as_deref()) {
                    ItemOutcome::Record(self.to_record(post, &query))
                } else {
                    ItemOutcome::Skipped
                }
            })
            .collect())
    }

    async fn close(&mut self) {
        self.pending.clear();
        self.query = None;
    }
}
