//! Asynchronous batch dispatch.
//!
//! Closed batch files are handed to a [`BatchDispatcher`]. Handing off never
//! blocks the producer: the [`TaskQueueDispatcher`] only enqueues a task and a
//! background worker posts the file to the backend, retrying transient
//! failures. Dispatch failures are the worker's to log; the producer never
//! sees them.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};
use variant_indexer_repository::{BackendTarget, BulkSummary, SearchEngineClient, SearchError};

use crate::errors::PipelineError;

/// Receives closed batch files and refresh-interval requests.
pub trait BatchDispatcher: Send + Sync {
    /// Hand a closed batch file over for submission to `target`.
    ///
    /// Ownership of the file passes to the dispatcher.
    fn submit_batch(&self, target: &BackendTarget, path: PathBuf) -> Result<(), PipelineError>;

    /// Ask for the index refresh interval of `target` to be set.
    fn restore_refresh_interval(&self, target: &BackendTarget, interval: &str) -> Result<(), PipelineError>;
}

/// Configuration for the dispatch worker.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum number of retry attempts for a failed request.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub max_retry_delay_ms: u64,
    /// Number of batches posted concurrently.
    pub max_concurrent_batches: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
            max_concurrent_batches: 2,
        }
    }
}

/// Totals reported by the worker once it stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub batches_posted: usize,
    pub batches_failed: usize,
    pub documents_indexed: usize,
    pub documents_failed: usize,
    pub settings_updated: usize,
}

#[derive(Debug)]
enum DispatchTask {
    PostBatch { target: BackendTarget, path: PathBuf },
    UpdateRefreshInterval { target: BackendTarget, interval: String },
    Shutdown,
}

enum TaskOutcome {
    Batch(Result<BulkSummary, SearchError>),
    Settings(Result<(), SearchError>),
}

/// In-process task queue feeding a background dispatch worker.
pub struct TaskQueueDispatcher {
    sender: mpsc::UnboundedSender<DispatchTask>,
}

/// Handle on the background worker.
pub struct DispatchWorker {
    handle: JoinHandle<DispatchStats>,
}

impl TaskQueueDispatcher {
    /// Spawn the worker on the current runtime.
    pub fn spawn(client: Arc<dyn SearchEngineClient>, config: DispatcherConfig) -> (Self, DispatchWorker) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(client, config, receiver));

        (Self { sender }, DispatchWorker { handle })
    }

    /// Stop accepting tasks. Already queued tasks still run.
    pub fn shutdown(&self) -> Result<(), PipelineError> {
        self.send(DispatchTask::Shutdown)
    }

    fn send(&self, task: DispatchTask) -> Result<(), PipelineError> {
        self.sender
            .send(task)
            .map_err(|_| PipelineError::dispatch("dispatch worker has stopped"))
    }
}

impl BatchDispatcher for TaskQueueDispatcher {
    fn submit_batch(&self, target: &BackendTarget, path: PathBuf) -> Result<(), PipelineError> {
        debug!(
            host = %target.host,
            port = target.port,
            index = %target.index,
            doc_type = %target.doc_type,
            path = %path.display(),
            "Queued batch"
        );
        self.send(DispatchTask::PostBatch {
            target: target.clone(),
            path,
        })
    }

    fn restore_refresh_interval(&self, target: &BackendTarget, interval: &str) -> Result<(), PipelineError> {
        self.send(DispatchTask::UpdateRefreshInterval {
            target: target.clone(),
            interval: interval.to_string(),
        })
    }
}

impl DispatchWorker {
    /// Wait for the worker to drain its queue after shutdown.
    pub async fn wait(self) -> Result<DispatchStats, PipelineError> {
        self.handle
            .await
            .map_err(|e| PipelineError::dispatch(format!("dispatch worker panicked: {}", e)))
    }
}

async fn run_worker(
    client: Arc<dyn SearchEngineClient>,
    config: DispatcherConfig,
    mut receiver: mpsc::UnboundedReceiver<DispatchTask>,
) -> DispatchStats {
    let permits = Arc::new(Semaphore::new(config.max_concurrent_batches.max(1)));
    let mut tasks = JoinSet::new();
    let mut stats = DispatchStats::default();

    info!("Dispatch worker started");

    while let Some(task) = receiver.recv().await {
        match task {
            DispatchTask::PostBatch { target, path } => {
                let client = Arc::clone(&client);
                let config = config.clone();
                let permits = Arc::clone(&permits);
                tasks.spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    TaskOutcome::Batch(post_batch(client.as_ref(), &config, &target, &path).await)
                });
            }
            DispatchTask::UpdateRefreshInterval { target, interval } => {
                let client = Arc::clone(&client);
                let config = config.clone();
                tasks.spawn(async move {
                    let result = with_retry(&config, "refresh interval update", || {
                        client.set_refresh_interval(&target.index, &interval)
                    })
                    .await;
                    TaskOutcome::Settings(result)
                });
            }
            DispatchTask::Shutdown => break,
        }

        // reap whatever already finished so the set does not grow unbounded
        while let Some(joined) = tasks.try_join_next() {
            record(&mut stats, joined);
        }
    }

    while let Some(joined) = tasks.join_next().await {
        record(&mut stats, joined);
    }

    info!(
        batches_posted = stats.batches_posted,
        batches_failed = stats.batches_failed,
        documents_indexed = stats.documents_indexed,
        documents_failed = stats.documents_failed,
        "Dispatch worker stopped"
    );
    stats
}

fn record(stats: &mut DispatchStats, joined: Result<TaskOutcome, tokio::task::JoinError>) {
    match joined {
        Ok(TaskOutcome::Batch(Ok(summary))) => {
            stats.batches_posted += 1;
            stats.documents_indexed += summary.succeeded;
            stats.documents_failed += summary.failed;
        }
        Ok(TaskOutcome::Batch(Err(e))) => {
            stats.batches_failed += 1;
            error!(error = %e, "Batch dispatch failed");
        }
        Ok(TaskOutcome::Settings(Ok(()))) => stats.settings_updated += 1,
        Ok(TaskOutcome::Settings(Err(e))) => {
            error!(error = %e, "Refresh interval update failed");
        }
        Err(e) => error!(error = %e, "Dispatch task panicked"),
    }
}

/// Post one batch file and delete it once the backend accepted it.
///
/// A file whose request failed is kept for inspection.
#[instrument(skip(client, config, target), fields(index = %target.index))]
async fn post_batch(
    client: &dyn SearchEngineClient,
    config: &DispatcherConfig,
    target: &BackendTarget,
    path: &Path,
) -> Result<BulkSummary, SearchError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SearchError::bulk_index(format!("Failed to read {}: {}", path.display(), e)))?;
    let lines: Vec<String> = content.lines().map(str::to_string).collect();

    let summary = with_retry(config, "bulk request", || client.bulk(&target.index, lines.clone())).await?;

    if summary.is_success() {
        info!(items = summary.total, "Batch indexed");
    } else {
        warn!(
            items = summary.total,
            failed = summary.failed,
            errors = ?summary.errors,
            "Batch indexed with item failures"
        );
    }

    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(error = %e, "Failed to remove dispatched batch file");
    }

    Ok(summary)
}

/// Run `operation` with exponential backoff on retryable errors.
async fn with_retry<T, F, Fut>(
    config: &DispatcherConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, SearchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SearchError>>,
{
    let mut delay_ms = config.initial_retry_delay_ms;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(attempt, operation = operation_name, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                warn!(
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms,
                    error = %e,
                    operation = operation_name,
                    "Request failed, retrying"
                );

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = std::cmp::min(delay_ms * 2, config.max_retry_delay_ms);
            }
            Err(e) => {
                debug!(error = %e, operation = operation_name, "Giving up");
                return Err(e);
            }
        }
    }
}
