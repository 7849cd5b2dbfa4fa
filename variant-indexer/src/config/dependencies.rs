//! Dependency initialization and wiring for the variant indexer.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use variant_indexer_pipeline::loader::{
    BatchDispatcher, DispatchStats, DispatchWorker, DispatcherConfig, TaskQueueDispatcher,
};
use variant_indexer_pipeline::orchestrator::{Orchestrator, RunSummary};
use variant_indexer_pipeline::schema::SchemaRegistry;
use variant_indexer_repository::opensearch::DISABLED_REFRESH_INTERVAL;
use variant_indexer_repository::{BackendTarget, OpenSearchClient, SearchEngineClient};

use crate::config::ImportSettings;
use crate::IndexingError;

/// Container for all initialized dependencies of one run.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
    dispatcher: Arc<TaskQueueDispatcher>,
    worker: DispatchWorker,
    target: BackendTarget,
    settings: ImportSettings,
    batch_dir: PathBuf,
}

impl Dependencies {
    /// Initialize all dependencies for the given settings.
    ///
    /// Verifies the backend is at least `yellow`, disables index refresh for
    /// the duration of the import and loads the mapping description. Any
    /// failure here happens before a single record is read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails
    pub async fn new(settings: ImportSettings) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            index = %settings.index,
            doc_type = %settings.doc_type,
            vcf = %settings.vcf_path.display(),
            mapping = %settings.mapping_path.display(),
            "Initializing dependencies"
        );

        let target = BackendTarget::from_url(
            &settings.opensearch_url,
            settings.index.clone(),
            settings.doc_type.clone(),
        )?;

        let schema = SchemaRegistry::load(&settings.mapping_path)
            .await
            .map_err(|e| IndexingError::config(format!("Failed to load mapping: {}", e)))?;

        info!(info_fields = schema.info_fields().count(), "Mapping loaded");

        // Initialize OpenSearch client
        let search_client = OpenSearchClient::new(&settings.opensearch_url)
            .await
            .map_err(|e| IndexingError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        // Verify OpenSearch is reachable
        let healthy = search_client
            .health_check()
            .await
            .map_err(|e| IndexingError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        search_client
            .set_refresh_interval(&settings.index, DISABLED_REFRESH_INTERVAL)
            .await?;

        let search_client = Arc::new(search_client);
        let (dispatcher, worker) =
            TaskQueueDispatcher::spawn(search_client.clone(), DispatcherConfig::default());
        let dispatcher = Arc::new(dispatcher);

        let batch_dir = tempfile::Builder::new()
            .prefix("variant-indexer-")
            .tempdir()?
            .keep();

        info!(batch_dir = %batch_dir.display(), "Created batch directory");

        let orchestrator = Orchestrator::with_config(
            Arc::new(schema),
            search_client,
            dispatcher.clone(),
            target.clone(),
            settings.run_context(),
            settings.orchestrator_config(),
        );

        Ok(Self {
            orchestrator,
            dispatcher,
            worker,
            target,
            settings,
            batch_dir,
        })
    }

    /// Run the import, then drain the dispatch queue.
    ///
    /// A shutdown signal stops reading; batches already handed off are still
    /// posted before this returns. A run that did not complete still gets its
    /// refresh interval restored.
    pub async fn run(self) -> Result<(RunSummary, DispatchStats), IndexingError> {
        let outcome = tokio::select! {
            result = self.orchestrator.run(&self.settings.vcf_path, &self.batch_dir) => {
                result.map_err(IndexingError::from)
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                Err(IndexingError::Interrupted)
            }
        };

        restore_after_failure(
            &outcome,
            self.dispatcher.as_ref(),
            &self.target,
            &self.settings.refresh_interval,
        );
        self.dispatcher.shutdown()?;
        let stats = self.worker.wait().await?;

        info!(
            batches_posted = stats.batches_posted,
            batches_failed = stats.batches_failed,
            documents_indexed = stats.documents_indexed,
            documents_failed = stats.documents_failed,
            "Dispatch worker finished"
        );

        // only succeeds once every batch file has been posted and removed
        if let Err(e) = std::fs::remove_dir(&self.batch_dir) {
            warn!(
                batch_dir = %self.batch_dir.display(),
                error = %e,
                "Batch directory retained"
            );
        }

        let summary = outcome?;
        Ok((summary, stats))
    }
}

/// Queue a refresh restore when the run ended early; a completed run restores
/// it itself after its grace period.
fn restore_after_failure<T>(
    outcome: &Result<T, IndexingError>,
    dispatcher: &dyn BatchDispatcher,
    target: &BackendTarget,
    interval: &str,
) {
    let Err(error) = outcome else {
        return;
    };

    warn!(error = %error, interval, "Run ended early, restoring refresh interval");
    if let Err(e) = dispatcher.restore_refresh_interval(target, interval) {
        warn!(error = %e, "Failed to queue refresh interval restore");
    }
}
