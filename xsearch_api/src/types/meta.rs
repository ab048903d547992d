use serde::{Deserialize, Serialize};

use super::{Tweet, User};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchMeta {
    #[serde(default)]
    pub result_count: i64,
    pub newest_id: Option<String>,
    pub oldest_id: Option<String>,
    pub next_token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<User>,
}

/// One page of recent-search results. `data` is omitted by the API when a
/// page is empty.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<Tweet>,
    #[serde(default)]
    pub includes: Includes,
    pub meta: SearchMeta,
}

impl SearchResponse {
    /// Looks up an expanded author by user id.
    pub fn user_by_id(&self, id: &str) -> Option<&User> {
        self.includes.users.iter().find(|u| u.id == id)
    }
}
