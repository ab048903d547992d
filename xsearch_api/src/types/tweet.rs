use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
    #[serde(default)]
    pub bookmark_count: Option<u64>,
    #[serde(default)]
    pub impression_count: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Hashtag {
    pub start: i64,
    pub end: i64,
    pub tag: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Entities {
    #[serde(default)]
    pub hashtags: Vec<Hashtag>,
}

/// A post as returned by the v2 API. Ids are decimal strings on the wire.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub author_id: Option<String>,
    pub lang: Option<String>,
    pub public_metrics: Option<PublicMetrics>,
    pub entities: Option<Entities>,
}

impl Tweet {
    /// The post id as an integer, when it is a valid decimal string.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.parse().ok()
    }

    /// Hashtag texts in order of appearance.
    pub fn hashtags(&self) -> Vec<String> {
        self.entities
            .as_ref()
            .map(|e| e.hashtags.iter().map(|h| h.tag.clone()).collect())
            .unwrap_or_default()
    }
}
