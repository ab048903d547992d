//! Run configuration: query list, output locations, and per-backend settings.
//!
//! Loaded from a TOML or YAML file (chosen by extension), then adjusted by
//! environment variables. Every field has a default, so an empty file is a
//! valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HarvestError;
use crate::pagination::{LoopConfig, DEFAULT_STALL_THRESHOLD};
use crate::record::{Backend, QuerySpec};
use crate::runner::OutputLayout;
use crate::validation::{validate_date, validate_max_results, validate_positive, validate_query};

pub const ENV_API_BEARER: &str = "TWITTER_BEARER_TOKEN";
pub const ENV_WEB_BEARER: &str = "POSTHARVEST_WEB_BEARER";
pub const ENV_STALL_THRESHOLD: &str = "POSTHARVEST_STALL_THRESHOLD";
pub const ENV_PACING_MS: &str = "POSTHARVEST_PACING_MS";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

#[derive(Deserialize)]
struct QueryFile {
    queries: Vec<QuerySpec>,
}

/// The built-in query list.
pub fn default_queries() -> Vec<QuerySpec> {
    let content = include_str!("../../seed_data/default_queries.toml");
    match toml::from_str::<QueryFile>(content) {
        Ok(file) => file.queries,
        Err(e) => {
            tracing::error!("built-in query list is invalid: {}", e);
            Vec::new()
        }
    }
}

/// Results tab of the search page.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchTab {
    #[default]
    Top,
    Latest,
    People,
    Media,
}

impl SearchTab {
    /// Value of the `f` URL parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            SearchTab::Top => "top",
            SearchTab::Latest => "live",
            SearchTab::People => "user",
            SearchTab::Media => "media",
        }
    }
}

/// Which shared file seeds the dedup index.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DedupFrom {
    #[default]
    Raw,
    Text,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub chrome_executable: Option<String>,
    /// Existing profile directory; keeps a logged-in session.
    pub profile_dir: Option<PathBuf>,
    pub search_tab: SearchTab,
    pub max_posts: usize,
    pub max_iterations: usize,
    pub scrolls_per_iteration: usize,
    pub scroll_pause_ms: u64,
    pub page_load_wait_ms: u64,
    pub base_url: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_executable: None,
            profile_dir: None,
            search_tab: SearchTab::Top,
            max_posts: 2000,
            max_iterations: 50,
            scrolls_per_iteration: 5,
            scroll_pause_ms: 2000,
            page_load_wait_ms: 5000,
            base_url: "https://x.com".to_string(),
        }
    }
}

impl BrowserSettings {
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    pub max_posts: usize,
    pub max_iterations: usize,
    /// Appended to each query as `since:<date>`.
    pub since: String,
    pub until: Option<String>,
    /// Allowed language tags. Posts with no language always pass.
    pub languages: Vec<String>,
    pub page_size: u32,
    pub raw_file: String,
    pub text_file: String,
    pub dedup_from: DedupFrom,
    pub base_url: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_posts: 200,
            max_iterations: 100,
            since: "2025-01-01".to_string(),
            until: None,
            languages: vec!["zh".to_string(), "en".to_string()],
            page_size: 20,
            raw_file: "twitter_search_raw.jsonl".to_string(),
            text_file: "twitter_search_text.jsonl".to_string(),
            dedup_from: DedupFrom::Raw,
            base_url: "https://api.x.com".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiSettings {
    /// Page size, 10 to 100.
    pub max_results: u32,
    pub max_posts: usize,
    pub max_iterations: usize,
    /// RFC 3339 lower bound; dropped when older than seven days.
    pub start_time: Option<String>,
    pub wait_on_rate_limit: bool,
    pub raw_file: String,
    pub text_file: String,
    pub dedup_from: DedupFrom,
    pub base_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            max_results: 100,
            max_posts: 100,
            max_iterations: 10,
            start_time: None,
            wait_on_rate_limit: true,
            raw_file: "twitter_api_raw.jsonl".to_string(),
            text_file: "twitter_api_text.jsonl".to_string(),
            dedup_from: DedupFrom::Raw,
            base_url: "https://api.twitter.com".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HarvestConfig {
    pub queries: Vec<QuerySpec>,
    pub output_dir: PathBuf,
    /// Overrides each backend's `max_posts`.
    pub max_posts_per_query: Option<usize>,
    /// Overrides each backend's `max_iterations`.
    pub max_iterations: Option<usize>,
    pub stall_threshold: usize,
    pub pacing_ms: u64,
    pub query_delay_ms: u64,
    pub browser: BrowserSettings,
    pub search: SearchSettings,
    pub api: ApiSettings,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            queries: default_queries(),
            output_dir: PathBuf::from("twitter_data"),
            max_posts_per_query: None,
            max_iterations: None,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
            pacing_ms: 2000,
            query_delay_ms: 5000,
            browser: BrowserSettings::default(),
            search: SearchSettings::default(),
            api: ApiSettings::default(),
        }
    }
}

impl HarvestConfig {
    /// Reads `.toml`, `.yaml`, or `.yml` files.
    pub fn load(path: &Path) -> Result<Self, HarvestError> {
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("toml") => Self::from_toml_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Err(HarvestError::Config(format!(
                "unsupported config format for {} (expected .toml, .yaml or .yml)",
                path.display()
            ))),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, HarvestError> {
        toml::from_str(content).map_err(|e| HarvestError::Config(e.to_string()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, HarvestError> {
        serde_yml::from_str(content).map_err(|e| HarvestError::Config(e.to_string()))
    }

    /// Applies `POSTHARVEST_STALL_THRESHOLD`, `POSTHARVEST_PACING_MS` and
    /// `CHROME_EXECUTABLE`. Unparsable values are ignored.
    pub fn apply_env(&mut self) {
        self.stall_threshold = env_usize(ENV_STALL_THRESHOLD, self.stall_threshold);
        self.pacing_ms = env_u64(ENV_PACING_MS, self.pacing_ms);
        if self.browser.chrome_executable.is_none() {
            self.browser.chrome_executable = std::env::var(ENV_CHROME_EXECUTABLE)
                .ok()
                .filter(|v| !v.trim().is_empty());
        }
    }

    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.queries.is_empty() {
            return Err(HarvestError::Config("no queries configured".to_string()));
        }
        for q in &self.queries {
            validate_query(&q.query)?;
        }
        validate_positive("stall_threshold", self.stall_threshold)?;
        if let Some(n) = self.max_posts_per_query {
            validate_positive("max_posts_per_query", n)?;
        }
        if let Some(n) = self.max_iterations {
            validate_positive("max_iterations", n)?;
        }
        validate_positive("browser.max_posts", self.browser.max_posts)?;
        validate_positive("browser.max_iterations", self.browser.max_iterations)?;
        validate_positive("search.max_posts", self.search.max_posts)?;
        validate_positive("search.max_iterations", self.search.max_iterations)?;
        validate_positive("api.max_posts", self.api.max_posts)?;
        validate_positive("api.max_iterations", self.api.max_iterations)?;
        validate_positive("browser.scrolls_per_iteration", self.browser.scrolls_per_iteration)?;
        validate_date(&self.search.since)?;
        if let Some(until) = &self.search.until {
            validate_date(until)?;
        }
        validate_max_results(self.api.max_results)?;
        Ok(())
    }

    pub fn query_delay(&self) -> Duration {
        Duration::from_millis(self.query_delay_ms)
    }

    pub fn loop_config(&self, backend: Backend) -> LoopConfig {
        let (max_posts, max_iterations, initial_wait) = match backend {
            Backend::Browser => (
                self.browser.max_posts,
                self.browser.max_iterations,
                Duration::from_millis(self.browser.page_load_wait_ms),
            ),
            Backend::SearchLibrary => {
                (self.search.max_posts, self.search.max_iterations, Duration::ZERO)
            }
            Backend::ApiClient => (self.api.max_posts, self.api.max_iterations, Duration::ZERO),
        };
        LoopConfig {
            target: self.max_posts_per_query.unwrap_or(max_posts),
            max_iterations: self.max_iterations.unwrap_or(max_iterations),
            stall_threshold: self.stall_threshold,
            pacing: Duration::from_millis(self.pacing_ms),
            initial_wait,
        }
    }

    /// Per-query files for the browser; shared raw/text files otherwise.
    pub fn output_layout(&self, backend: Backend) -> OutputLayout {
        let shared = |raw: &str, text: &str, from: DedupFrom| {
            let raw = self.output_dir.join(raw);
            let text = self.output_dir.join(text);
            let dedup_from = match from {
                DedupFrom::Raw => raw.clone(),
                DedupFrom::Text => text.clone(),
            };
            OutputLayout::Shared {
                raw,
                text: Some(text),
                dedup_from,
            }
        };
        match backend {
            Backend::Browser => OutputLayout::PerQuery {
                dir: self.output_dir.clone(),
            },
            Backend::SearchLibrary => shared(
                &self.search.raw_file,
                &self.search.text_file,
                self.search.dedup_from,
            ),
            Backend::ApiClient => {
                shared(&self.api.raw_file, &self.api.text_file, self.api.dedup_from)
            }
        }
    }
}

/// Reads a required credential. Whitespace-only values count as missing.
pub fn credential(name: &'static str) -> Result<String, HarvestError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(HarvestError::MissingCredential(name)),
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(default)
}
