//! Per-run session: runs the pagination loop once per query and owns the
//! source's teardown.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{error, info};

use crate::dedup::DedupIndex;
use crate::error::HarvestError;
use crate::pagination::{run_pagination, LoopConfig, StopReason};
use crate::record::{PostRecord, QuerySpec};
use crate::sink::JsonlSink;
use crate::source::PostSource;

pub const DEFAULT_QUERY_DELAY: Duration = Duration::from_secs(5);

/// Where records go and which file seeds the dedup index.
#[derive(Debug, Clone)]
pub enum OutputLayout {
    /// One `<label>.jsonl` per query in `dir`. The index is reloaded from
    /// that file before each query.
    PerQuery { dir: PathBuf },
    /// One raw file (and optional text file) for the whole run. The index is
    /// loaded once from `dedup_from`.
    Shared {
        raw: PathBuf,
        text: Option<PathBuf>,
        dedup_from: PathBuf,
    },
}

impl OutputLayout {
    pub fn path_for(&self, query: &QuerySpec) -> PathBuf {
        match self {
            OutputLayout::PerQuery { dir } => dir.join(format!("{}.jsonl", query.file_stem())),
            OutputLayout::Shared { raw, .. } => raw.clone(),
        }
    }
}

/// Totals for one query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub label: String,
    pub query: String,
    pub output: PathBuf,
    pub new_records: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub item_failures: usize,
    pub iterations: usize,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub queries: Vec<QueryOutcome>,
    /// Every record written during the run, in write order.
    pub records: Vec<PostRecord>,
}

impl RunSummary {
    pub fn total_new(&self) -> usize {
        self.queries.iter().map(|q| q.new_records).sum()
    }

    pub fn total_duplicates(&self) -> usize {
        self.queries.iter().map(|q| q.duplicates).sum()
    }

    pub fn failed_queries(&self) -> usize {
        self.queries
            .iter()
            .filter(|q| matches!(q.stop_reason, StopReason::SourceFailed(_)))
            .count()
    }
}

type QueryObserver = Box<dyn FnMut(&QueryOutcome) + Send>;

/// Explicit per-run state: the source, the output layout, and, for the
/// shared layout, the open sink and its dedup index.
pub struct HarvestSession {
    source: Box<dyn PostSource>,
    layout: OutputLayout,
    loop_config: LoopConfig,
    query_delay: Duration,
    shared: Option<(DedupIndex, JsonlSink)>,
    observer: Option<QueryObserver>,
}

impl HarvestSession {
    pub fn new(source: Box<dyn PostSource>, layout: OutputLayout, loop_config: LoopConfig) -> Self {
        Self {
            source,
            layout,
            loop_config,
            query_delay: DEFAULT_QUERY_DELAY,
            shared: None,
            observer: None,
        }
    }

    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    /// Called after each query finishes, successful or not.
    pub fn on_query_finished(mut self, observer: impl FnMut(&QueryOutcome) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Runs every query in order. A failing query is logged and recorded in
    /// the summary; the next query still runs. Only an unusable shared
    /// output file is an error.
    pub async fn run(&mut self, queries: &[QuerySpec]) -> Result<RunSummary, HarvestError> {
        if let OutputLayout::Shared {
            raw,
            text,
            dedup_from,
        } = &self.layout
        {
            if self.shared.is_none() {
                let (index, _) = DedupIndex::load(dedup_from)?;
                let sink = JsonlSink::open(raw, text.as_deref())?;
                self.shared = Some((index, sink));
            }
        }

        let mut summary = RunSummary::default();
        let total = queries.len();
        for (i, query) in queries.iter().enumerate() {
            info!("[{}/{}] {} | {}", i + 1, total, query.label, query.query);
            let (outcome, records) = self.run_query(query).await;
            info!(
                query = %query.label,
                new = outcome.new_records,
                duplicates = outcome.duplicates,
                "query finished: {}",
                outcome.stop_reason
            );
            if let Some(observer) = self.observer.as_mut() {
                observer(&outcome);
            }
            summary.queries.push(outcome);
            summary.records.extend(records);

            if i + 1 < total && !self.query_delay.is_zero() {
                tokio::time::sleep(self.query_delay).await;
            }
        }

        info!(
            "run complete: {} new, {} duplicates across {} queries",
            summary.total_new(),
            summary.total_duplicates(),
            summary.queries.len()
        );
        Ok(summary)
    }

    async fn run_query(&mut self, query: &QuerySpec) -> (QueryOutcome, Vec<PostRecord>) {
        let output = self.layout.path_for(query);

        let result = match self.shared.as_mut() {
            Some((index, sink)) => {
                Ok(run_pagination(self.source.as_mut(), index, sink, query, &self.loop_config).await)
            }
            None => match open_per_query(&output) {
                Ok((mut index, mut sink)) => {
                    let outcome = run_pagination(
                        self.source.as_mut(),
                        &mut index,
                        &mut sink,
                        query,
                        &self.loop_config,
                    )
                    .await;
                    if let Err(e) = sink.close() {
                        error!(path = %output.display(), "failed to flush output: {}", e);
                    }
                    Ok(outcome)
                }
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(outcome) => (
                QueryOutcome {
                    label: query.label.clone(),
                    query: query.query.clone(),
                    output,
                    new_records: outcome.new_records,
                    duplicates: outcome.duplicates,
                    skipped: outcome.skipped,
                    item_failures: outcome.item_failures,
                    iterations: outcome.iterations,
                    stop_reason: outcome.stop_reason,
                },
                outcome.records,
            ),
            Err(e) => {
                error!(query = %query.label, "could not open output {}: {}", output.display(), e);
                (
                    QueryOutcome {
                        label: query.label.clone(),
                        query: query.query.clone(),
                        output,
                        new_records: 0,
                        duplicates: 0,
                        skipped: 0,
                        item_failures: 0,
                        iterations: 0,
                        stop_reason: StopReason::SourceFailed(e.to_string()),
                    },
                    Vec::new(),
                )
            }
        }
    }

    /// Releases the source's external session and flushes shared output.
    /// Safe to call more than once.
    pub async fn close(&mut self) {
        self.source.close().await;
        if let Some((_, sink)) = self.shared.take() {
            if let Err(e) = sink.close() {
                error!("failed to flush output: {}", e);
            }
        }
    }
}

fn open_per_query(path: &Path) -> Result<(DedupIndex, JsonlSink), HarvestError> {
    let (index, _) = DedupIndex::load(path)?;
    let sink = JsonlSink::open(path, None)?;
    Ok((index, sink))
}
