//! # Variant Indexer Repository
//!
//! This crate provides traits and implementations for talking to the search
//! backend: looking up existing variant documents, submitting bulk payloads
//! and toggling the index refresh interval around an import. It includes
//! definitions for errors, interfaces, and a concrete implementation for
//! OpenSearch.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use config::BackendTarget;
pub use errors::SearchError;
pub use interfaces::{DocumentLookup, SearchEngineClient};
pub use opensearch::OpenSearchClient;
pub use types::{BulkSummary, StoredSource};
