mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{page, read_lines, ScriptedSource, Step};
use postharvest_lib::{HarvestSession, LoopConfig, OutputLayout, QuerySpec, StopReason};

fn loop_config() -> LoopConfig {
    LoopConfig {
        target: 100,
        max_iterations: 10,
        stall_threshold: 2,
        pacing: Duration::from_millis(100),
        initial_wait: Duration::ZERO,
    }
}

fn queries() -> Vec<QuerySpec> {
    vec![
        QuerySpec::new("日本 安保 lang:zh", "Japan security (Chinese)"),
        QuerySpec::new("Japan security lang:en", "Japan security (English)"),
        QuerySpec::new("NATO lang:en", "NATO"),
    ]
}

#[tokio::test(start_paused = true)]
async fn per_query_layout_writes_one_file_per_label() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(vec![
        vec![Step::Final(page(1..=2))],
        vec![Step::Final(page(3..=5))],
        vec![Step::Final(page([1]))],
    ]);
    let mut session = HarvestSession::new(
        Box::new(source),
        OutputLayout::PerQuery {
            dir: dir.path().to_path_buf(),
        },
        loop_config(),
    );

    let summary = session.run(&queries()).await.unwrap();
    session.close().await;

    assert_eq!(summary.queries.len(), 3);
    assert_eq!(summary.total_new(), 6);
    // Each file has its own index, so post 1 is new again under "NATO".
    assert_eq!(summary.queries[2].new_records, 1);
    assert_eq!(
        read_lines(&dir.path().join("Japan_security__Chinese_.jsonl")).len(),
        2
    );
    assert_eq!(
        read_lines(&dir.path().join("Japan_security__English_.jsonl")).len(),
        3
    );
    assert_eq!(read_lines(&dir.path().join("NATO.jsonl")).len(), 1);
    assert_eq!(summary.records.len(), 6);
}

#[tokio::test(start_paused = true)]
async fn per_query_layout_reloads_dedup_from_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("NATO.jsonl");
    std::fs::write(&path, "{\"id\": 1}\nnot json\n").unwrap();

    let source = ScriptedSource::single(vec![Step::Final(page(1..=3))]);
    let mut session = HarvestSession::new(
        Box::new(source),
        OutputLayout::PerQuery {
            dir: dir.path().to_path_buf(),
        },
        loop_config(),
    );
    let summary = session
        .run(&[QuerySpec::new("NATO lang:en", "NATO")])
        .await
        .unwrap();

    assert_eq!(summary.queries[0].new_records, 2);
    assert_eq!(summary.queries[0].duplicates, 1);
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);
}

#[tokio::test(start_paused = true)]
async fn shared_layout_dedups_across_queries_and_writes_text_view() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw.jsonl");
    let text = dir.path().join("text.jsonl");
    let source = ScriptedSource::new(vec![
        vec![Step::Final(page(1..=3))],
        vec![Step::Final(page(2..=4))],
    ]);
    let mut session = HarvestSession::new(
        Box::new(source),
        OutputLayout::Shared {
            raw: raw.clone(),
            text: Some(text.clone()),
            dedup_from: raw.clone(),
        },
        loop_config(),
    );

    let summary = session.run(&queries()[..2]).await.unwrap();
    session.close().await;

    assert_eq!(summary.total_new(), 4);
    assert_eq!(summary.total_duplicates(), 2);
    assert_eq!(read_lines(&raw).len(), 4);
    let text_lines = read_lines(&text);
    assert_eq!(text_lines.len(), 4);
    assert_eq!(text_lines[3]["query"], "Japan security lang:en");
    assert_eq!(text_lines[3]["source"], "api-client");
}

#[tokio::test(start_paused = true)]
async fn failing_query_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = ScriptedSource::new(vec![
        vec![Step::Batch(page(1..=2)), Step::FailAdvance("driver crashed".into())],
        vec![Step::Final(page([10]))],
        vec![Step::Final(page([20]))],
    ]);
    source.fail_begin_for = Some("Japan security (English)".to_string());
    let closed = source.closed.clone();

    let mut session = HarvestSession::new(
        Box::new(source),
        OutputLayout::PerQuery {
            dir: dir.path().to_path_buf(),
        },
        loop_config(),
    );
    let summary = session.run(&queries()).await.unwrap();
    session.close().await;

    assert!(matches!(summary.queries[0].stop_reason, StopReason::SourceFailed(_)));
    assert_eq!(summary.queries[0].new_records, 2);
    assert!(matches!(summary.queries[1].stop_reason, StopReason::SourceFailed(_)));
    assert_eq!(summary.queries[2].stop_reason, StopReason::Exhausted);
    assert_eq!(summary.queries[2].new_records, 1);
    assert_eq!(summary.failed_queries(), 2);
    assert_eq!(
        read_lines(&dir.path().join("Japan_security__Chinese_.jsonl")).len(),
        2
    );
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn waits_between_queries_but_not_after_the_last() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(vec![
        vec![Step::Final(page([1]))],
        vec![Step::Final(page([2]))],
    ]);
    let finished = Arc::new(Mutex::new(Vec::new()));
    let seen = finished.clone();
    let mut session = HarvestSession::new(
        Box::new(source),
        OutputLayout::PerQuery {
            dir: dir.path().to_path_buf(),
        },
        loop_config(),
    )
    .with_query_delay(Duration::from_secs(5))
    .on_query_finished(move |q| seen.lock().unwrap().push(q.label.clone()));

    let start = tokio::time::Instant::now();
    session.run(&queries()[..2]).await.unwrap();
    let elapsed = start.elapsed();

    // Two iterations of 100ms pacing plus one inter-query delay.
    assert!(elapsed >= Duration::from_millis(5200));
    assert!(elapsed < Duration::from_secs(10));
    assert_eq!(
        *finished.lock().unwrap(),
        vec![
            "Japan security (Chinese)".to_string(),
            "Japan security (English)".to_string()
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unreadable_shared_dedup_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    // A directory cannot be read as a dedup file.
    let source = ScriptedSource::single(vec![]);
    let mut session = HarvestSession::new(
        Box::new(source),
        OutputLayout::Shared {
            raw: dir.path().join("raw.jsonl"),
            text: None,
            dedup_from: dir.path().to_path_buf(),
        },
        loop_config(),
    );
    assert!(session.run(&queries()).await.is_err());
}
