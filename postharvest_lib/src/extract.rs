//! DOM extraction for rendered post elements.
//!
//! Each accessor looks up a single field and returns `None` when the lookup
//! fails; [`extract_post`] applies the field default and the validity check.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::numbers::{parse_count, parse_count_label};
use crate::record::{Backend, PostRecord};

/// Selector for one rendered post on the search page.
pub const POST_SELECTOR: &str = r#"article[data-testid="tweet"]"#;

/// Per-query context stamped onto every extracted record.
#[derive(Debug, Clone)]
pub struct ExtractContext {
    pub query: String,
    pub base_url: String,
    pub source: Backend,
}

impl ExtractContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            base_url: "https://x.com".to_string(),
            source: Backend::Browser,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn first<'a>(root: &ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    root.select(&sel).next()
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Handle from the profile link under the author block, without the `@`.
pub fn author_handle(post: &ElementRef<'_>) -> Option<String> {
    let link = first(post, r#"[data-testid="User-Name"] a[href]"#)?;
    let href = link.value().attr("href")?;
    let handle = href
        .trim_end_matches('/')
        .rsplit('/')
        .next()?
        .trim_start_matches('@');
    if handle.is_empty() {
        None
    } else {
        Some(handle.to_string())
    }
}

pub fn display_name(post: &ElementRef<'_>) -> Option<String> {
    let sel = selector(r#"[data-testid="User-Name"] span"#)?;
    post.select(&sel)
        .map(|span| element_text(&span))
        .find(|text| !text.is_empty() && !text.starts_with('@'))
}

pub fn timestamp(post: &ElementRef<'_>) -> Option<String> {
    let time = first(post, "time[datetime]")?;
    let value = time.value().attr("datetime")?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub fn body_text(post: &ElementRef<'_>) -> Option<String> {
    first(post, r#"[data-testid="tweetText"]"#).map(|el| element_text(&el))
}

pub fn language(post: &ElementRef<'_>) -> Option<String> {
    let el = first(post, r#"[data-testid="tweetText"][lang]"#)?;
    el.value()
        .attr("lang")
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

pub fn first_image_url(post: &ElementRef<'_>) -> Option<String> {
    let sel = selector(r#"[data-testid="tweetPhoto"] img[src]"#)?;
    post.select(&sel)
        .filter_map(|img| img.value().attr("src"))
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

/// Status link, absolutized against the context base URL.
pub fn permalink(post: &ElementRef<'_>, base_url: &str) -> Option<String> {
    let link = first(post, r#"a[href*="/status/"]"#)?;
    let href = link.value().attr("href")?;
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// Count shown on an action button. Falls back to the button's
/// accessibility label when no visible count is rendered.
fn button_count(post: &ElementRef<'_>, test_ids: &[&str]) -> Option<u64> {
    for id in test_ids {
        let Some(button) = first(post, &format!(r#"[data-testid="{}"]"#, id)) else {
            continue;
        };
        let visible = element_text(&button);
        if !visible.is_empty() {
            return Some(parse_count(&visible));
        }
        if let Some(label) = button.value().attr("aria-label") {
            return Some(parse_count_label(label));
        }
        return Some(0);
    }
    None
}

pub fn like_count(post: &ElementRef<'_>) -> Option<u64> {
    button_count(post, &["like", "unlike"])
}

pub fn retweet_count(post: &ElementRef<'_>) -> Option<u64> {
    button_count(post, &["retweet", "unretweet"])
}

pub fn reply_count(post: &ElementRef<'_>) -> Option<u64> {
    button_count(post, &["reply"])
}

/// Builds a record from one post's outer HTML. Returns `None` for items
/// without an author handle or timestamp (ads, partially rendered posts).
pub fn extract_post(html: &str, ctx: &ExtractContext) -> Option<PostRecord> {
    let fragment = Html::parse_fragment(html);
    let post_sel = selector(POST_SELECTOR)?;
    let root = fragment.root_element();
    let post = root.select(&post_sel).next().unwrap_or(root);

    let Some(username) = author_handle(&post) else {
        debug!("post has no author handle, skipping");
        return None;
    };
    let Some(date) = timestamp(&post) else {
        debug!(username = %username, "post has no timestamp, skipping");
        return None;
    };

    let display_name = display_name(&post).unwrap_or_else(|| {
        debug!(username = %username, "display name not found");
        String::new()
    });
    let text = body_text(&post).unwrap_or_else(|| {
        debug!(username = %username, "post text not found");
        String::new()
    });

    Some(PostRecord {
        id: None,
        url: permalink(&post, &ctx.base_url),
        username,
        display_name,
        date,
        text,
        image: first_image_url(&post),
        like_count: like_count(&post).unwrap_or(0),
        retweet_count: retweet_count(&post).unwrap_or(0),
        reply_count: reply_count(&post),
        quote_count: None,
        language: language(&post),
        hashtags: Vec::new(),
        user_verified: None,
        user_followers: None,
        author_id: None,
        query: ctx.query.clone(),
        source: ctx.source,
    })
}

/// Splits a page's HTML into post fragments. Used against saved pages;
/// the live browser reads each element's outer HTML directly.
pub fn post_fragments(page_html: &str) -> Vec<String> {
    let Some(sel) = selector(POST_SELECTOR) else {
        return Vec::new();
    };
    let doc = Html::parse_document(page_html);
    doc.select(&sel).map(|el| el.html()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = r#"
<article data-testid="tweet">
  <div data-testid="User-Name">
    <a href="/policywatch"><span>Policy Watch</span></a>
    <a href="/policywatch"><span>@policywatch</span></a>
    <a href="/policywatch/status/1871234567890123456"><time datetime="2025-03-04T12:30:00.000Z">Mar 4</time></a>
  </div>
  <div data-testid="tweetText" lang="en">Trade talks <span>resume</span></div>
  <div data-testid="tweetPhoto"><img src="https://pbs.example/media/a.jpg"></div>
  <button data-testid="reply" aria-label="12 Replies. Reply"></button>
  <button data-testid="retweet"><span>1,234</span></button>
  <button data-testid="like"><span>1.5K</span></button>
</article>"#;

    fn ctx() -> ExtractContext {
        ExtractContext::new("trade -is:retweet")
    }

    #[test]
    fn extracts_all_fields() {
        let record = extract_post(POST, &ctx()).unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.username, "policywatch");
        assert_eq!(record.display_name, "Policy Watch");
        assert_eq!(record.date, "2025-03-04T12:30:00.000Z");
        assert_eq!(record.text, "Trade talks resume");
        assert_eq!(record.language.as_deref(), Some("en"));
        assert_eq!(record.image.as_deref(), Some("https://pbs.example/media/a.jpg"));
        assert_eq!(
            record.url.as_deref(),
            Some("https://x.com/policywatch/status/1871234567890123456")
        );
        assert_eq!(record.like_count, 1500);
        assert_eq!(record.retweet_count, 1234);
        assert_eq!(record.reply_count, Some(12));
        assert_eq!(record.query, "trade -is:retweet");
        assert_eq!(record.source, Backend::Browser);
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let html = r#"<article data-testid="tweet">
            <div data-testid="User-Name"><a href="/solo"></a></div>
            <time datetime="2025-01-01T00:00:00.000Z"></time>
        </article>"#;
        let record = extract_post(html, &ctx()).unwrap();
        assert_eq!(record.username, "solo");
        assert_eq!(record.display_name, "");
        assert_eq!(record.text, "");
        assert_eq!(record.image, None);
        assert_eq!(record.like_count, 0);
        assert_eq!(record.retweet_count, 0);
        assert_eq!(record.reply_count, None);
        assert_eq!(record.language, None);
    }

    #[test]
    fn missing_handle_or_timestamp_is_no_record() {
        let no_time = r#"<article data-testid="tweet">
            <div data-testid="User-Name"><a href="/ads"></a></div>
            <div data-testid="tweetText">Promoted</div>
        </article>"#;
        assert!(extract_post(no_time, &ctx()).is_none());

        let no_handle = r#"<article data-testid="tweet">
            <time datetime="2025-01-01T00:00:00.000Z"></time>
        </article>"#;
        assert!(extract_post(no_handle, &ctx()).is_none());
    }

    #[test]
    fn extraction_is_deterministic() {
        let a = serde_json::to_string(&extract_post(POST, &ctx()).unwrap()).unwrap();
        let b = serde_json::to_string(&extract_post(POST, &ctx()).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unlike_button_counts_as_likes() {
        let html = r#"<article data-testid="tweet">
            <div data-testid="User-Name"><a href="/a"></a></div>
            <time datetime="t"></time>
            <button data-testid="unlike" aria-label="2,001 Likes. Liked"></button>
        </article>"#;
        assert_eq!(extract_post(html, &ctx()).unwrap().like_count, 2001);
    }

    #[test]
    fn splits_page_into_posts() {
        let page = format!("<html><body><div>{}{}</div></body></html>", POST, POST);
        let fragments = post_fragments(&page);
        assert_eq!(fragments.len(), 2);
        assert!(extract_post(&fragments[0], &ctx()).is_some());
    }
}
