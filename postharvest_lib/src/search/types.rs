//! Wire types for the adaptive search timeline.

use std::collections::HashMap;

use chrono::DateTime;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GuestActivation {
    pub guest_token: String,
}

#[derive(Debug, Deserialize)]
pub struct AdaptiveResponse {
    #[serde(rename = "globalObjects", default)]
    pub global_objects: GlobalObjects,
    #[serde(default)]
    pub timeline: Timeline,
}

#[derive(Debug, Default, Deserialize)]
pub struct GlobalObjects {
    #[serde(default)]
    pub tweets: HashMap<String, RawTweet>,
    #[serde(default)]
    pub users: HashMap<String, RawUser>,
}

#[derive(Debug, Deserialize)]
pub struct RawTweet {
    pub id_str: String,
    pub created_at: String,
    #[serde(alias = "text")]
    pub full_text: String,
    pub user_id_str: String,
    #[serde(default)]
    pub favorite_count: u64,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub quote_count: u64,
    pub lang: Option<String>,
    #[serde(default)]
    pub entities: RawEntities,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawEntities {
    #[serde(default)]
    pub hashtags: Vec<RawHashtag>,
    #[serde(default)]
    pub media: Vec<RawMedia>,
}

#[derive(Debug, Deserialize)]
pub struct RawHashtag {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RawMedia {
    pub media_url_https: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawUser {
    pub screen_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub followers_count: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub add_entries: Option<AddEntries>,
    pub replace_entry: Option<ReplaceEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AddEntries {
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceEntry {
    pub entry: Entry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub entry_id: String,
    pub content: serde_json::Value,
}

impl Entry {
    /// The cursor value of a `Bottom` cursor entry.
    fn bottom_cursor(&self) -> Option<&str> {
        let cursor = self.content.pointer("/operation/cursor")?;
        if cursor.get("cursorType")?.as_str()? != "Bottom" {
            return None;
        }
        cursor.get("value")?.as_str()
    }
}

/// One post with its author joined in.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPost {
    pub id: u64,
    pub date: String,
    pub username: String,
    pub display_name: String,
    pub verified: bool,
    pub followers: u64,
    pub text: String,
    pub like_count: u64,
    pub retweet_count: u64,
    pub reply_count: u64,
    pub quote_count: u64,
    pub lang: Option<String>,
    pub hashtags: Vec<String>,
    pub image: Option<String>,
}

impl SearchPost {
    pub fn url(&self) -> String {
        format!("https://x.com/{}/status/{}", self.username, self.id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Newest first.
    pub posts: Vec<SearchPost>,
    pub next_cursor: Option<String>,
}

/// `Wed Jan 01 12:00:00 +0000 2025` becomes RFC 3339; anything else is kept.
fn normalize_date(raw: &str) -> String {
    DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y")
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|_| raw.to_string())
}

impl AdaptiveResponse {
    pub fn into_page(self) -> SearchPage {
        let next_cursor = self
            .timeline
            .instructions
            .iter()
            .flat_map(|ins| {
                let added = ins.add_entries.iter().flat_map(|a| a.entries.iter());
                let replaced = ins.replace_entry.iter().map(|r| &r.entry);
                added.chain(replaced)
            })
            .filter_map(|e| e.bottom_cursor())
            .last()
            .map(str::to_string);

        let users = self.global_objects.users;
        let mut posts: Vec<SearchPost> = self
            .global_objects
            .tweets
            .into_values()
            .filter_map(|t| {
                let id = t.id_str.parse::<u64>().ok()?;
                let user = users.get(&t.user_id_str)?;
                Some(SearchPost {
                    id,
                    date: normalize_date(&t.created_at),
                    username: user.screen_name.clone(),
                    display_name: user.name.clone(),
                    verified: user.verified,
                    followers: user.followers_count,
                    text: t.full_text,
                    like_count: t.favorite_count,
                    retweet_count: t.retweet_count,
                    reply_count: t.reply_count,
                    quote_count: t.quote_count,
                    lang: t.lang.filter(|l| !l.is_empty()),
                    hashtags: t.entities.hashtags.into_iter().map(|h| h.text).collect(),
                    image: t
                        .entities
                        .media
                        .into_iter()
                        .find_map(|m| m.media_url_https),
                })
            })
            .collect();
        posts.sort_by(|a, b| b.id.cmp(&a.id));

        SearchPage { posts, next_cursor }
    }
}
