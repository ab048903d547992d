//! Fetch / extract / dedup / write loop for a single query.

use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::dedup::DedupIndex;
use crate::record::{PostRecord, QuerySpec};
use crate::sink::JsonlSink;
use crate::source::{Advance, ItemOutcome, PostSource, SourceError};

pub const DEFAULT_STALL_THRESHOLD: usize = 3;
pub const DEFAULT_PACING: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// New (non-duplicate) records to collect before stopping.
    pub target: usize,
    pub max_iterations: usize,
    /// Consecutive iterations with zero new records that end the loop.
    pub stall_threshold: usize,
    /// Wait between triggering more content and extracting it.
    pub pacing: Duration,
    /// Wait after `begin`, before the first iteration.
    pub initial_wait: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target: 100,
            max_iterations: 50,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
            pacing: DEFAULT_PACING,
            initial_wait: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    MaxIterations,
    Stalled,
    Exhausted,
    SourceFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TargetReached => write!(f, "target reached"),
            StopReason::MaxIterations => write!(f, "max iterations"),
            StopReason::Stalled => write!(f, "stalled"),
            StopReason::Exhausted => write!(f, "exhausted"),
            StopReason::SourceFailed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub new_records: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub item_failures: usize,
    pub iterations: usize,
    pub stop_reason: StopReason,
    /// Records written during this loop, in write order.
    pub records: Vec<PostRecord>,
}

impl LoopOutcome {
    fn new() -> Self {
        Self {
            new_records: 0,
            duplicates: 0,
            skipped: 0,
            item_failures: 0,
            iterations: 0,
            stop_reason: StopReason::MaxIterations,
            records: Vec::new(),
        }
    }

    fn fail(mut self, query: &QuerySpec, err: SourceError) -> Self {
        error!(query = %query.label, "collection ended early: {}", err);
        self.stop_reason = StopReason::SourceFailed(err.to_string());
        self
    }
}

/// Runs one query to a terminal condition. Never returns an error: a
/// loop-level failure ends collection with `StopReason::SourceFailed` and
/// everything written so far stays on disk.
pub async fn run_pagination(
    source: &mut dyn PostSource,
    index: &mut DedupIndex,
    sink: &mut JsonlSink,
    query: &QuerySpec,
    cfg: &LoopConfig,
) -> LoopOutcome {
    let mut outcome = LoopOutcome::new();

    if let Err(e) = source.begin(query).await {
        return outcome.fail(query, e);
    }
    if !cfg.initial_wait.is_zero() {
        tokio::time::sleep(cfg.initial_wait).await;
    }

    let mut consecutive_empty = 0usize;
    loop {
        outcome.iterations += 1;

        let advance = match source.advance().await {
            Ok(a) => a,
            Err(e) => return outcome.fail(query, e),
        };
        tokio::time::sleep(cfg.pacing).await;

        let items = match source.collect().await {
            Ok(items) => items,
            Err(e) => return outcome.fail(query, e),
        };

        let before = outcome.new_records;
        for item in items {
            if outcome.new_records >= cfg.target {
                break;
            }
            let record = match item {
                ItemOutcome::Record(r) => r,
                ItemOutcome::Skipped => {
                    outcome.skipped += 1;
                    continue;
                }
                ItemOutcome::Failed(msg) => {
                    warn!(query = %query.label, "item extraction failed: {}", msg);
                    outcome.item_failures += 1;
                    continue;
                }
            };
            if !record.is_valid() {
                outcome.skipped += 1;
                continue;
            }
            let key = record.identity_key();
            if index.contains(&key) {
                outcome.duplicates += 1;
                continue;
            }
            if let Err(e) = sink.write(&record) {
                return outcome.fail(query, SourceError::Sink(e.to_string()));
            }
            index.insert(key);
            outcome.new_records += 1;
            info!(
                "[{}/{}] @{}: {}",
                outcome.new_records,
                cfg.target,
                record.username,
                preview(&record.text)
            );
            outcome.records.push(record);
        }

        if outcome.new_records == before {
            consecutive_empty += 1;
            debug!(
                query = %query.label,
                consecutive_empty,
                "iteration produced no new records"
            );
        } else {
            consecutive_empty = 0;
        }

        if outcome.new_records >= cfg.target {
            outcome.stop_reason = StopReason::TargetReached;
            break;
        }
        if outcome.iterations >= cfg.max_iterations {
            outcome.stop_reason = StopReason::MaxIterations;
            break;
        }
        if consecutive_empty >= cfg.stall_threshold {
            info!(query = %query.label, "no new posts for {} iterations, stopping", consecutive_empty);
            outcome.stop_reason = StopReason::Stalled;
            break;
        }
        if advance == Advance::Exhausted {
            outcome.stop_reason = StopReason::Exhausted;
            break;
        }
    }

    outcome
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 50;
    let mut out: String = text.chars().take(MAX_CHARS).collect();
    if text.chars().count() > MAX_CHARS {
        out.push_str("...");
    }
    out.replace('\n', " ")
}
