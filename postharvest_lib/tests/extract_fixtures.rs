use postharvest_lib::extract::{extract_post, post_fragments, ExtractContext};
use postharvest_lib::{Backend, IdentityKey};

fn page() -> String {
    let path = format!("{}/tests/fixtures/search_page.html", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path, e))
}

#[test]
fn extracts_rendered_posts_and_skips_ads() {
    let ctx = ExtractContext::new("韩国 (国会) -is:retweet lang:zh");
    let fragments = post_fragments(&page());
    assert_eq!(fragments.len(), 3);

    let records: Vec<_> = fragments.iter().map(|f| extract_post(f, &ctx)).collect();
    assert!(records[1].is_none());

    let first = records[0].as_ref().unwrap();
    assert_eq!(first.username, "koreadesk");
    assert_eq!(first.display_name, "Korea Desk");
    assert_eq!(first.language.as_deref(), Some("zh"));
    assert_eq!(first.like_count, 15_000);
    assert_eq!(first.retweet_count, 1_200);
    assert_eq!(first.reply_count, Some(3));
    assert_eq!(
        first.image.as_deref(),
        Some("https://pbs.example/media/GK1.jpg?format=jpg&name=small")
    );
    assert_eq!(first.source, Backend::Browser);
    assert_eq!(
        first.identity_key(),
        IdentityKey::Composite("koreadesk_2025-03-04T12:30:00.000Z".to_string())
    );

    let third = records[2].as_ref().unwrap();
    assert_eq!(third.username, "seoul_watch");
    assert_eq!(third.like_count, 987);
    assert_eq!(third.retweet_count, 2048);
    assert_eq!(third.reply_count, Some(0));
    assert_eq!(
        third.url.as_deref(),
        Some("https://x.com/seoul_watch/status/1871234567890123999")
    );
}
