//! Size-bounded batch files.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};
use variant_indexer_repository::BackendTarget;

use crate::errors::PipelineError;
use crate::loader::bulk::BulkAction;
use crate::loader::dispatcher::BatchDispatcher;

/// Default rotation threshold: 80 MiB.
pub const DEFAULT_BATCH_THRESHOLD_BYTES: u64 = 83_886_080;

/// Name of the `n`th batch file of a run.
pub fn batch_file_name(n: usize) -> String {
    format!("output_{}.json", n)
}

struct OpenBatch {
    path: PathBuf,
    writer: BufWriter<File>,
    bytes: u64,
}

/// Writes bulk units into `output_<n>.json` files and hands each closed file
/// to the dispatcher.
///
/// A batch is closed once its size exceeds the threshold and the run's unit
/// count is even, so an action header is never split from its payload. Files
/// are opened lazily: no empty batch is ever dispatched.
pub struct BatchEmitter {
    dispatcher: Arc<dyn BatchDispatcher>,
    target: BackendTarget,
    directory: PathBuf,
    threshold_bytes: u64,
    current: Option<OpenBatch>,
    unit_count: u64,
    files_opened: usize,
    dispatched: usize,
}

impl BatchEmitter {
    pub fn new(
        dispatcher: Arc<dyn BatchDispatcher>,
        target: BackendTarget,
        directory: impl Into<PathBuf>,
        threshold_bytes: u64,
    ) -> Self {
        Self {
            dispatcher,
            target,
            directory: directory.into(),
            threshold_bytes,
            current: None,
            unit_count: 0,
            files_opened: 0,
            dispatched: 0,
        }
    }

    /// Append both units of a bulk action.
    pub async fn emit(&mut self, action: &BulkAction) -> Result<(), PipelineError> {
        for line in action.lines()? {
            self.write_unit(&line).await?;
        }
        Ok(())
    }

    async fn write_unit(&mut self, line: &str) -> Result<(), PipelineError> {
        let batch = match self.current.as_mut() {
            Some(batch) => batch,
            None => {
                self.files_opened += 1;
                let path = self.directory.join(batch_file_name(self.files_opened));
                let file = File::create(&path).await?;
                debug!(path = %path.display(), "Opened batch file");
                self.current.insert(OpenBatch {
                    path,
                    writer: BufWriter::new(file),
                    bytes: 0,
                })
            }
        };

        batch.writer.write_all(line.as_bytes()).await?;
        batch.writer.write_all(b"\n").await?;
        batch.bytes += line.len() as u64 + 1;
        self.unit_count += 1;

        if batch.bytes > self.threshold_bytes && self.unit_count % 2 == 0 {
            self.rotate().await?;
        }

        Ok(())
    }

    /// Close the open batch, if any, and dispatch it.
    async fn rotate(&mut self) -> Result<(), PipelineError> {
        let Some(mut batch) = self.current.take() else {
            return Ok(());
        };

        batch.writer.flush().await?;
        batch.writer.into_inner().sync_all().await?;

        self.dispatcher.submit_batch(&self.target, batch.path.clone())?;
        self.dispatched += 1;
        info!(
            path = %batch.path.display(),
            bytes = batch.bytes,
            batch = self.dispatched,
            "Dispatched batch"
        );

        Ok(())
    }

    /// Flush and dispatch the residual batch. Returns the number of batches
    /// dispatched over the emitter's lifetime.
    pub async fn finish(mut self) -> Result<usize, PipelineError> {
        self.rotate().await?;
        Ok(self.dispatched)
    }
}
