//! Canonical post record, its identity key, and the two persisted views.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which collector produced a record.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    Browser,
    /// Accepts the tag written by the older snscrape-based collector.
    #[serde(alias = "snscrape")]
    SearchLibrary,
    #[serde(alias = "tweepy")]
    ApiClient,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Backend::Browser => "browser",
            Backend::SearchLibrary => "search-library",
            Backend::ApiClient => "api-client",
        };
        write!(f, "{}", value)
    }
}

/// Identity used to deduplicate posts within and across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    /// Platform post id.
    Numeric(u64),
    /// `"{username}_{date}"` for backends that expose no id.
    Composite(String),
}

impl IdentityKey {
    /// `"{username}_{date}"` with any leading `@` dropped from the handle.
    pub fn composite(username: &str, date: &str) -> Self {
        Self::Composite(format!("{}_{}", username.trim_start_matches('@'), date))
    }

    /// Derives the key of a persisted line. Mirrors [`PostRecord::identity_key`]:
    /// a numeric (or numeric-string) `id` wins, otherwise a non-empty
    /// `username` plus `date` (or legacy `timestamp`).
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value.get("id") {
            Some(serde_json::Value::Number(n)) => {
                if let Some(id) = n.as_u64() {
                    return Some(Self::Numeric(id));
                }
            }
            Some(serde_json::Value::String(s)) => {
                if let Ok(id) = s.trim().parse::<u64>() {
                    return Some(Self::Numeric(id));
                }
            }
            _ => {}
        }
        let username = value.get("username").and_then(|v| v.as_str())?;
        let date = value
            .get("date")
            .or_else(|| value.get("timestamp"))
            .and_then(|v| v.as_str())?;
        if username.trim_start_matches('@').is_empty() || date.is_empty() {
            return None;
        }
        Some(Self::composite(username, date))
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Numeric(id) => write!(f, "{}", id),
            IdentityKey::Composite(key) => write!(f, "{}", key),
        }
    }
}

/// One collected post. This is also the raw JSONL schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PostRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    pub username: String,
    #[serde(default, alias = "name")]
    pub display_name: String,
    #[serde(alias = "timestamp")]
    pub date: String,
    #[serde(default, alias = "content")]
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "likes")]
    pub like_count: u64,
    #[serde(default, alias = "retweets")]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: Option<u64>,
    #[serde(default)]
    pub quote_count: Option<u64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_followers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default)]
    pub query: String,
    pub source: Backend,
}

impl PostRecord {
    /// Numeric id when present, otherwise `username_date`.
    pub fn identity_key(&self) -> IdentityKey {
        match self.id {
            Some(id) => IdentityKey::Numeric(id),
            None => IdentityKey::composite(&self.username, &self.date),
        }
    }

    /// A record may be persisted only with an author and a timestamp.
    pub fn is_valid(&self) -> bool {
        !self.username.is_empty() && !self.date.is_empty()
    }

    /// Training-style projection of this record.
    pub fn text_view(&self) -> TextRecord<'_> {
        TextRecord {
            id: self.id,
            text: &self.text,
            date: &self.date,
            lang: self.language.as_deref(),
            query: &self.query,
            source: self.source,
            url: self.url.as_deref(),
        }
    }
}

/// Minimal `{id, text, date, lang, query, source, url}` line.
#[derive(Serialize, Debug, PartialEq)]
pub struct TextRecord<'a> {
    pub id: Option<u64>,
    pub text: &'a str,
    pub date: &'a str,
    pub lang: Option<&'a str>,
    pub query: &'a str,
    pub source: Backend,
    pub url: Option<&'a str>,
}

/// A search to run: operator-grammar query text plus a human label.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub query: String,
    #[serde(alias = "description")]
    pub label: String,
}

impl QuerySpec {
    pub fn new(query: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            label: label.into(),
        }
    }

    /// Filesystem-safe stem derived from the label.
    pub fn file_stem(&self) -> String {
        crate::validation::sanitize_label(&self.label)
    }
}
