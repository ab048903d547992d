#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use postharvest_lib::{
    Advance, Backend, ItemOutcome, PostRecord, PostSource, QuerySpec, SourceError,
};

pub fn post(id: u64) -> PostRecord {
    PostRecord {
        id: Some(id),
        url: Some(format!("https://x.com/desk/status/{}", id)),
        username: "desk".to_string(),
        display_name: "Desk".to_string(),
        date: format!("2025-02-01T00:00:{:02}Z", id % 60),
        text: format!("post {}", id),
        image: None,
        like_count: id,
        retweet_count: 0,
        reply_count: Some(0),
        quote_count: Some(0),
        language: Some("en".to_string()),
        hashtags: vec![],
        user_verified: None,
        user_followers: None,
        author_id: None,
        query: String::new(),
        source: Backend::ApiClient,
    }
}

pub fn page(ids: impl IntoIterator<Item = u64>) -> Vec<ItemOutcome> {
    ids.into_iter().map(|id| ItemOutcome::Record(post(id))).collect()
}

/// One scripted step of a source.
pub enum Step {
    Batch(Vec<ItemOutcome>),
    /// Last batch; `advance` reports `Exhausted`.
    Final(Vec<ItemOutcome>),
    FailAdvance(String),
}

/// Replays pages per query. Once the script runs out, every further
/// iteration yields an empty batch, like scrolling a page that stopped
/// growing.
pub struct ScriptedSource {
    scripts: VecDeque<Vec<Step>>,
    current: VecDeque<Step>,
    pending: Vec<ItemOutcome>,
    query: String,
    pub fail_begin_for: Option<String>,
    pub closed: Arc<AtomicBool>,
    pub advances: Arc<AtomicUsize>,
}

impl ScriptedSource {
    /// One script per query, consumed in order by `begin`.
    pub fn new(scripts: Vec<Vec<Step>>) -> Self {
        Self {
            scripts: scripts.into(),
            current: VecDeque::new(),
            pending: Vec::new(),
            query: String::new(),
            fail_begin_for: None,
            closed: Arc::new(AtomicBool::new(false)),
            advances: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn single(steps: Vec<Step>) -> Self {
        Self::new(vec![steps])
    }
}

#[async_trait]
impl PostSource for ScriptedSource {
    fn backend(&self) -> Backend {
        Backend::ApiClient
    }

    async fn begin(&mut self, query: &QuerySpec) -> Result<(), SourceError> {
        if self.fail_begin_for.as_deref() == Some(query.label.as_str()) {
            self.scripts.pop_front();
            return Err(SourceError::Browser("page failed to load".to_string()));
        }
        self.current = self.scripts.pop_front().unwrap_or_default().into();
        self.query = query.query.clone();
        Ok(())
    }

    async fn advance(&mut self) -> Result<Advance, SourceError> {
        self.advances.fetch_add(1, Ordering::SeqCst);
        match self.current.pop_front() {
            Some(Step::Batch(items)) => {
                self.pending = items;
                Ok(Advance::More)
            }
            Some(Step::Final(items)) => {
                self.pending = items;
                Ok(Advance::Exhausted)
            }
            Some(Step::FailAdvance(msg)) => Err(SourceError::Browser(msg)),
            None => {
                self.pending = Vec::new();
                Ok(Advance::More)
            }
        }
    }

    async fn collect(&mut self) -> Result<Vec<ItemOutcome>, SourceError> {
        let query = self.query.clone();
        Ok(std::mem::take(&mut self.pending)
            .into_iter()
            .map(|item| match item {
                ItemOutcome::Record(mut r) => {
                    r.query = query.clone();
                    ItemOutcome::Record(r)
                }
                other => other,
            })
            .collect())
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn read_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}
