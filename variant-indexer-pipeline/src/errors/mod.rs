//! Error types for the variant indexer pipeline.

mod reader_error;
mod schema_error;
mod transform_error;

pub use reader_error::ReaderError;
pub use schema_error::SchemaError;
pub use transform_error::TransformError;

use thiserror::Error;
use variant_indexer_repository::SearchError;

/// Errors that can occur in the variant indexer pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The mapping description is invalid.
    #[error("Schema error: {0}")]
    SchemaError(#[from] SchemaError),

    /// The VCF stream is structurally broken.
    #[error("Reader error: {0}")]
    ReaderError(#[from] ReaderError),

    /// A single record could not be transformed.
    #[error("Transform error: {0}")]
    TransformError(#[from] TransformError),

    /// Error from the search backend.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),

    /// Error from the loader component.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// A batch could not be handed to the dispatcher.
    #[error("Dispatch error: {0}")]
    DispatchError(String),

    /// IO error while writing batch files.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PipelineError {
    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }

    /// Create a dispatch error.
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::DispatchError(msg.into())
    }

    /// Whether the error only invalidates the current record.
    ///
    /// Record-level errors are logged and the record is skipped; everything
    /// else aborts the run.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::TransformError(_) | Self::SearchError(_))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::LoaderError(format!("Failed to serialize document: {}", err))
    }
}
