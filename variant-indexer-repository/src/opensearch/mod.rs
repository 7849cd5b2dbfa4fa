//! OpenSearch implementation of the backend interfaces.
//!
//! This module provides a concrete implementation of `SearchEngineClient`
//! and `DocumentLookup` using OpenSearch as the backend.

mod client;
mod index_config;

pub use client::OpenSearchClient;
pub use index_config::{refresh_settings, DEFAULT_REFRESH_INTERVAL, DISABLED_REFRESH_INTERVAL};
