//! # Variant Indexer Pipeline
//!
//! This crate provides the pipeline components for turning an annotated VCF
//! into bulk-action batches for the search backend.
//!
//! ## Architecture
//!
//! The pipeline follows a Reader-Processor-Merge-Loader pattern:
//!
//! 1. **Reader**: Streams raw VCF records lazily, one line at a time
//! 2. **Processor**: Decodes INFO/FORMAT text into typed, nested fields
//!    driven by the mapping description held in the schema registry
//! 3. **Merge**: Computes document identity and decides create vs update
//! 4. **Loader**: Writes bulk action pairs into size-bounded batch files and
//!    hands each closed batch to an asynchronous dispatcher
//! 5. **Orchestrator**: Coordinates the pipeline flow for one import run

pub mod counters;
pub mod errors;
pub mod loader;
pub mod merge;
pub mod orchestrator;
pub mod processor;
pub mod reader;
pub mod schema;

pub use counters::ProgressCounters;
pub use errors::PipelineError;
