//! Search engine client trait definition.
//!
//! This module defines the abstract interface for the write side of the
//! search backend, allowing for different backend implementations
//! (OpenSearch, Elasticsearch, mocks in tests).

use async_trait::async_trait;

use crate::errors::SearchError;
use crate::types::BulkSummary;

/// Abstract interface for search backend write operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` so a single client can be shared
/// between the parsing task and the dispatch workers.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Submit newline-delimited bulk action lines to an index.
    ///
    /// # Arguments
    ///
    /// * `index` - Target index name
    /// * `lines` - Alternating action header and payload lines
    ///
    /// # Returns
    ///
    /// * `Ok(BulkSummary)` - Per-item outcome counts reported by the backend
    /// * `Err(SearchError)` - If the request itself failed
    async fn bulk(&self, index: &str, lines: Vec<String>) -> Result<BulkSummary, SearchError>;

    /// Set the refresh interval of an index (`-1` disables refreshing).
    ///
    /// # Arguments
    ///
    /// * `index` - Target index name
    /// * `interval` - Interval string understood by the backend, e.g. `30s`
    async fn set_refresh_interval(&self, index: &str, interval: &str) -> Result<(), SearchError>;

    /// Check if the search backend is healthy and reachable.
    ///
    /// Waits for the cluster to reach at least `yellow` status.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the cluster is yellow or green
    /// * `Ok(false)` - If the cluster is red
    /// * `Err(SearchError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchError>;
}
