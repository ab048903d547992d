use std::time::Duration;

use postharvest_lib::search::{SearchError, SearchOptions, SearchScrapeClient, SearchSource};
use postharvest_lib::{
    run_pagination, Advance, Backend, DedupIndex, ItemOutcome, JsonlSink, LoopConfig,
    PostSource, QuerySpec, StopReason,
};
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> serde_json::Value {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path, e));
    serde_json::from_str(&content).unwrap()
}

async fn mount_guest_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/1.1/guest/activate.json"))
        .and(header("authorization", "Bearer web-bearer"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "guest_token": "guest-1" })),
        )
        .mount(server)
        .await;
}

async fn mount_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/2/search/adaptive.json"))
        .and(query_param_is_missing("cursor"))
        .and(header("x-guest-token", "guest-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("adaptive_page1.json")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/search/adaptive.json"))
        .and(query_param("cursor", "scroll:page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("adaptive_page2.json")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/search/adaptive.json"))
        .and(query_param("cursor", "scroll:page3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("adaptive_empty.json")))
        .mount(server)
        .await;
}

fn options() -> SearchOptions {
    SearchOptions {
        since: "2024-12-01".to_string(),
        until: None,
        languages: vec!["zh".to_string(), "en".to_string()],
        page_size: 20,
    }
}

#[tokio::test]
async fn client_reads_posts_and_bottom_cursor() {
    let server = MockServer::start().await;
    mount_guest_token(&server).await;
    mount_pages(&server).await;

    let mut client = SearchScrapeClient::with_base_url(&server.uri(), "web-bearer").unwrap();
    let page = client.search_page("EU sanctions", None, 20).await.unwrap();

    assert_eq!(page.next_cursor.as_deref(), Some("scroll:page2"));
    assert_eq!(page.posts.len(), 3);
    assert_eq!(page.posts[0].id, 1871234567890123003);
    let zh = &page.posts[2];
    assert_eq!(zh.username, "eudesk_cn");
    assert_eq!(zh.date, "2024-12-24T08:15:00+00:00");
    assert_eq!(zh.hashtags, vec!["EU".to_string()]);
    assert_eq!(zh.image.as_deref(), Some("https://pbs.example/media/eu.jpg"));
    assert_eq!(zh.followers, 8800);

    let next = client
        .search_page("EU sanctions", Some("scroll:page2"), 20)
        .await
        .unwrap();
    assert_eq!(next.next_cursor.as_deref(), Some("scroll:page3"));
    assert_eq!(next.posts.len(), 1);
}

#[tokio::test]
async fn client_sends_query_and_paging_params() {
    let server = MockServer::start().await;
    mount_guest_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/2/search/adaptive.json"))
        .and(query_param("q", "北约 since:2025-01-01"))
        .and(query_param("tweet_search_mode", "live"))
        .and(query_param("count", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("adaptive_empty.json")))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = SearchScrapeClient::with_base_url(&server.uri(), "web-bearer").unwrap();
    let page = client
        .search_page("北约 since:2025-01-01", None, 40)
        .await
        .unwrap();
    assert!(page.posts.is_empty());
}

#[tokio::test]
async fn client_reactivates_rejected_guest_token() {
    let server = MockServer::start().await;
    mount_guest_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/2/search/adaptive.json"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/search/adaptive.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("adaptive_page2.json")))
        .with_priority(2)
        .mount(&server)
        .await;

    let mut client = SearchScrapeClient::with_base_url(&server.uri(), "web-bearer").unwrap();
    let page = client.search_page("q", None, 20).await.unwrap();
    assert_eq!(page.posts.len(), 1);
}

#[tokio::test]
async fn client_maps_rate_limit_and_activation_failure() {
    let server = MockServer::start().await;
    mount_guest_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/2/search/adaptive.json"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    let mut client = SearchScrapeClient::with_base_url(&server.uri(), "web-bearer").unwrap();
    assert!(matches!(
        client.search_page("q", None, 20).await,
        Err(SearchError::RateLimited)
    ));

    let empty = MockServer::start().await;
    let mut client = SearchScrapeClient::with_base_url(&empty.uri(), "web-bearer").unwrap();
    assert!(matches!(
        client.search_page("q", None, 20).await,
        Err(SearchError::GuestToken(_))
    ));
}

#[tokio::test]
async fn source_filters_languages_and_reports_exhaustion() {
    let server = MockServer::start().await;
    mount_guest_token(&server).await;
    mount_pages(&server).await;

    let client = SearchScrapeClient::with_base_url(&server.uri(), "web-bearer").unwrap();
    let mut source = SearchSource::new(client, options());
    assert_eq!(source.backend(), Backend::SearchLibrary);
    source
        .begin(&QuerySpec::new("EU sanctions", "EU policy (English)"))
        .await
        .unwrap();

    assert_eq!(source.advance().await.unwrap(), Advance::More);
    let items = source.collect().await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], ItemOutcome::Skipped);
    match &items[2] {
        ItemOutcome::Record(r) => {
            assert_eq!(r.id, Some(1871234567890123001));
            assert_eq!(r.query, "EU sanctions");
            assert_eq!(
                r.url.as_deref(),
                Some("https://x.com/eudesk_cn/status/1871234567890123001")
            );
            assert_eq!(r.user_verified, Some(false));
            assert_eq!(r.reply_count, Some(4));
        }
        other => panic!("expected a record, got {:?}", other),
    }

    assert_eq!(source.advance().await.unwrap(), Advance::More);
    assert_eq!(source.collect().await.unwrap().len(), 1);
    assert_eq!(source.advance().await.unwrap(), Advance::Exhausted);
    assert!(source.collect().await.unwrap().is_empty());
    assert_eq!(source.advance().await.unwrap(), Advance::Exhausted);
}

#[tokio::test]
async fn source_runs_through_the_pagination_loop() {
    let server = MockServer::start().await;
    mount_guest_token(&server).await;
    mount_pages(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw.jsonl");
    let text = dir.path().join("text.jsonl");
    let client = SearchScrapeClient::with_base_url(&server.uri(), "web-bearer").unwrap();
    let mut source = SearchSource::new(client, options());
    let mut index = DedupIndex::new();
    let mut sink = JsonlSink::open(&raw, Some(&text)).unwrap();
    let cfg = LoopConfig {
        target: 100,
        max_iterations: 10,
        stall_threshold: 3,
        pacing: Duration::ZERO,
        initial_wait: Duration::ZERO,
    };

    let outcome = run_pagination(
        &mut source,
        &mut index,
        &mut sink,
        &QuerySpec::new("EU sanctions", "EU"),
        &cfg,
    )
    .await;
    sink.close().unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Exhausted);
    assert_eq!(outcome.new_records, 3);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.iterations, 3);
    let text_body = std::fs::read_to_string(&text).unwrap();
    let first: serde_json::Value = serde_json::from_str(text_body.lines().next().unwrap()).unwrap();
    assert_eq!(first["source"], "search-library");
    assert_eq!(first["lang"], "en");
}
