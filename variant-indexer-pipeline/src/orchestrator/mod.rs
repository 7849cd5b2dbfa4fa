//! Orchestrator module for the variant indexer pipeline.
//!
//! Drives one import run: estimate the record count, stream the VCF through
//! the processor and merge engine, write bulk batches, then restore the
//! index refresh interval once the backend has had time to catch up.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, info, instrument, warn};
use variant_indexer_repository::opensearch::DEFAULT_REFRESH_INTERVAL;
use variant_indexer_repository::{BackendTarget, DocumentLookup};

use crate::counters::ProgressCounters;
use crate::errors::PipelineError;
use crate::loader::{BatchDispatcher, BatchEmitter, BulkAction, DEFAULT_BATCH_THRESHOLD_BYTES};
use crate::merge::{MergeEngine, RunContext};
use crate::processor::{FieldTransformer, VariantProcessor};
use crate::reader::{estimate, RawVariantRecord, VcfReader, DEFAULT_ESTIMATE_LINES};
use crate::schema::SchemaRegistry;

const PROGRESS_LOG_INTERVAL: u64 = 100_000;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Lines sampled by the size estimator.
    pub estimate_sample_lines: usize,
    /// Hard limit on the number of records read.
    pub max_records: Option<usize>,
    /// Batch rotation threshold in bytes.
    pub batch_threshold_bytes: u64,
    /// Wait between the last dispatch and the refresh restore.
    pub grace_period: Duration,
    /// Refresh interval restored at the end of the run.
    pub refresh_interval: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            estimate_sample_lines: DEFAULT_ESTIMATE_LINES,
            max_records: None,
            batch_threshold_bytes: DEFAULT_BATCH_THRESHOLD_BYTES,
            grace_period: Duration::from_secs(60),
            refresh_interval: DEFAULT_REFRESH_INTERVAL.to_string(),
        }
    }
}

/// Outcome of one import run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub counters: ProgressCounters,
    /// Records dropped on a record-level error.
    pub skipped: u64,
    /// Batch files handed to the dispatcher.
    pub batches: usize,
    pub estimated_records: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Wires reader, processor, merge engine and batch emitter for one run.
pub struct Orchestrator {
    processor: VariantProcessor,
    merge: MergeEngine,
    dispatcher: Arc<dyn BatchDispatcher>,
    target: BackendTarget,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        schema: Arc<SchemaRegistry>,
        lookup: Arc<dyn DocumentLookup>,
        dispatcher: Arc<dyn BatchDispatcher>,
        target: BackendTarget,
        context: RunContext,
    ) -> Self {
        Self::with_config(
            schema,
            lookup,
            dispatcher,
            target,
            context,
            OrchestratorConfig::default(),
        )
    }

    pub fn with_config(
        schema: Arc<SchemaRegistry>,
        lookup: Arc<dyn DocumentLookup>,
        dispatcher: Arc<dyn BatchDispatcher>,
        target: BackendTarget,
        context: RunContext,
        config: OrchestratorConfig,
    ) -> Self {
        let processor = VariantProcessor::new(Arc::clone(&schema), context.label.clone());
        let merge = MergeEngine::new(FieldTransformer::new(schema), lookup, context);

        Self {
            processor,
            merge,
            dispatcher,
            target,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run the import of `vcf_path`, writing batch files into `batch_dir`.
    ///
    /// Structural reader errors and batch file failures abort the run;
    /// record-level errors are logged and the record is skipped.
    #[instrument(skip(self), fields(index = %self.target.index, update = self.merge.context().update))]
    pub async fn run(&self, vcf_path: &Path, batch_dir: &Path) -> Result<RunSummary, PipelineError> {
        let started_at = Utc::now();
        info!(
            label = self.merge.context().label().unwrap_or("None"),
            "Starting import run"
        );

        let estimated_records = estimate(vcf_path, self.config.estimate_sample_lines).await?;
        info!(estimated_records, "Estimated record count");

        let limit = self.config.max_records.unwrap_or(usize::MAX);
        let records = VcfReader::open(vcf_path).await?.into_stream().take(limit);
        futures::pin_mut!(records);

        let mut emitter = BatchEmitter::new(
            Arc::clone(&self.dispatcher),
            self.target.clone(),
            batch_dir,
            self.config.batch_threshold_bytes,
        );
        let mut counters = ProgressCounters::new();
        let mut skipped = 0u64;

        while let Some(record) = records.try_next().await? {
            match self.process_record(&record, &mut counters).await {
                Ok(action) => emitter.emit(&action).await?,
                Err(e) if e.is_record_level() => {
                    warn!(line = record.line_number(), error = %e, "Skipping record");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }

            if counters.processed > 0 && counters.processed % PROGRESS_LOG_INTERVAL == 0 {
                info!(
                    processed = counters.processed,
                    estimated_records,
                    "Import progress"
                );
            }
        }

        let batches = emitter.finish().await?;
        info!(
            batches,
            grace_secs = self.config.grace_period.as_secs(),
            "All batches dispatched, waiting before refresh restore"
        );

        tokio::time::sleep(self.config.grace_period).await;
        self.dispatcher
            .restore_refresh_interval(&self.target, &self.config.refresh_interval)?;

        let summary = RunSummary {
            counters,
            skipped,
            batches,
            estimated_records,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            processed = summary.counters.processed,
            created = summary.counters.created,
            updated = summary.counters.updated,
            skipped,
            elapsed_ms = summary.elapsed().num_milliseconds(),
            "Import run complete"
        );

        Ok(summary)
    }

    async fn process_record(
        &self,
        record: &RawVariantRecord,
        counters: &mut ProgressCounters,
    ) -> Result<BulkAction, PipelineError> {
        let candidate = self.processor.prepare(record)?;
        let outcome = self.merge.resolve(candidate, counters).await?;
        debug!(id = outcome.id(), "Resolved record");
        BulkAction::from_outcome(&outcome)
    }
}
