//! # Variant Indexer
//!
//! Main library for the annotated-VCF variant indexer.
//!
//! This crate provides the entry point and configuration for running one
//! import of a VCF file into the search backend.

pub mod config;

pub use config::{Dependencies, ImportSettings};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] variant_indexer_pipeline::PipelineError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] variant_indexer_repository::SearchError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The run was interrupted before the stream ended.
    #[error("Interrupted by shutdown signal")]
    Interrupted,
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
