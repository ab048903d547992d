//! Headless-browser backend: infinite scroll on the search page, DOM
//! extraction of every rendered post.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::Url;

use crate::config::{BrowserSettings, SearchTab};
use crate::error::HarvestError;
use crate::extract::{extract_post, ExtractContext, POST_SELECTOR};
use crate::record::{Backend, QuerySpec};
use crate::source::{Advance, ItemOutcome, PostSource, SourceError};

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
const PAGE_HEIGHT: &str = "document.body.scrollHeight";
const EXPAND_SETTLE: Duration = Duration::from_secs(1);

/// Clicks every truncated-post expander and returns how many were clicked.
const EXPAND_SHOW_MORE: &str = r#"(() => {
  let clicked = 0;
  for (const span of document.querySelectorAll('span')) {
    const text = span.textContent || '';
    if (text.includes('Show more') || text.includes('显示更多')) {
      try { span.scrollIntoView(); span.click(); clicked++; } catch (e) {}
    }
  }
  return clicked;
})()"#;

/// Search page URL for a query on the given results tab.
pub fn search_url(base_url: &str, query: &str, tab: SearchTab) -> Result<String, HarvestError> {
    let mut url = Url::parse(base_url)
        .and_then(|u| u.join("/search"))
        .map_err(|e| HarvestError::Config(format!("invalid base url {}: {}", base_url, e)))?;
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("src", "typed_query")
        .append_pair("f", tab.as_param());
    Ok(url.to_string())
}

fn cdp(e: CdpError) -> SourceError {
    SourceError::Browser(e.to_string())
}

pub struct BrowserSource {
    settings: BrowserSettings,
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    page: Option<Page>,
    ctx: Option<ExtractContext>,
}

impl BrowserSource {
    /// Starts Chromium. Fails before any query runs when no browser can be
    /// launched.
    pub async fn launch(settings: BrowserSettings) -> Result<Self, HarvestError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1280, 900)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(exe) = &settings.chrome_executable {
            builder = builder.chrome_executable(exe);
        }
        if let Some(profile) = &settings.profile_dir {
            info!("using browser profile {}", profile.display());
            builder = builder.user_data_dir(profile);
        }
        let config = builder
            .build()
            .map_err(|e| HarvestError::Browser(format!("invalid browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarvestError::Browser(format!("failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler error: {}", e);
                }
            }
        });
        info!("browser started (headless: {})", settings.headless);

        Ok(Self {
            settings,
            browser: Some(browser),
            handler: Some(handler),
            page: None,
            ctx: None,
        })
    }

    fn page(&self) -> Result<&Page, SourceError> {
        self.page.as_ref().ok_or(SourceError::NotStarted)
    }

    async fn page_height(&self) -> Result<i64, SourceError> {
        let result = self.page()?.evaluate(PAGE_HEIGHT).await.map_err(cdp)?;
        result
            .into_value::<i64>()
            .map_err(|e| SourceError::Browser(format!("unreadable page height: {}", e)))
    }

    async fn expand_truncated(&self) {
        let Ok(page) = self.page() else {
            return;
        };
        match page.evaluate(EXPAND_SHOW_MORE).await {
            Ok(result) => {
                let clicked = result.into_value::<i64>().unwrap_or(0);
                if clicked > 0 {
                    debug!("expanded {} truncated posts", clicked);
                }
            }
            Err(e) => debug!("show-more expansion failed: {}", e),
        }
    }
}

#[async_trait]
impl PostSource for BrowserSource {
    fn backend(&self) -> Backend {
        Backend::Browser
    }

    async fn begin(&mut self, query: &QuerySpec) -> Result<(), SourceError> {
        let url = search_url(&self.settings.base_url, &query.query, self.settings.search_tab)
            .map_err(|e| SourceError::Browser(e.to_string()))?;
        info!("opening {}", url);
        match &self.page {
            Some(page) => {
                page.goto(url.clone()).await.map_err(cdp)?;
            }
            None => {
                let browser = self.browser.as_ref().ok_or(SourceError::NotStarted)?;
                let page = browser.new_page(url.clone()).await.map_err(cdp)?;
                self.page = Some(page);
            }
        }
        self.ctx = Some(ExtractContext::new(&query.query).with_base_url(&self.settings.base_url));
        Ok(())
    }

    async fn advance(&mut self) -> Result<Advance, SourceError> {
        let mut last_height = self.page_height().await?;
        for scroll in 0..self.settings.scrolls_per_iteration {
            self.page()?.evaluate(SCROLL_TO_BOTTOM).await.map_err(cdp)?;
            tokio::time::sleep(self.settings.scroll_pause()).await;
            self.expand_truncated().await;

            let height = self.page_height().await?;
            if height == last_height {
                debug!("page height unchanged after {} scrolls", scroll + 1);
                break;
            }
            last_height = height;
        }
        Ok(Advance::More)
    }

    async fn collect(&mut self) -> Result<Vec<ItemOutcome>, SourceError> {
        self.expand_truncated().await;
        tokio::time::sleep(EXPAND_SETTLE).await;

        let ctx = self.ctx.clone().ok_or(SourceError::NotStarted)?;
        let elements = self
            .page()?
            .find_elements(POST_SELECTOR)
            .await
            .map_err(cdp)?;
        debug!("found {} post elements", elements.len());

        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            let item = match element.outer_html().await {
                Ok(Some(html)) => match extract_post(&html, &ctx) {
                    Some(record) => ItemOutcome::Record(record),
                    None => ItemOutcome::Skipped,
                },
                Ok(None) => ItemOutcome::Skipped,
                Err(e) => ItemOutcome::Failed(e.to_string()),
            };
            items.push(item);
        }
        Ok(items)
    }

    async fn close(&mut self) {
        self.page = None;
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                error!("failed to close browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("browser process wait failed: {}", e);
            }
            info!("browser closed");
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
            let _ = handler.await;
        }
    }
}
