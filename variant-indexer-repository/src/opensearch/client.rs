//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! and `DocumentLookup` using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::IndicesPutSettingsParts,
    params::WaitForStatus,
    BulkParts, GetParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::{DocumentLookup, SearchEngineClient};
use crate::opensearch::index_config::refresh_settings;
use crate::types::{BulkSummary, StoredSource};

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// let client = OpenSearchClient::new("http://localhost:9200").await?;
///
/// client.set_refresh_interval("variants", "-1").await?;
/// let summary = client.bulk("variants", lines).await?;
/// client.set_refresh_interval("variants", "30s").await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If connection setup fails
    pub async fn new(url: &str) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch client");

        Ok(Self { client })
    }

    /// Extract the stored source from a get-document response body.
    ///
    /// Returns `None` when the document was not found or carries no source.
    fn source_from_response(body: &Value) -> Option<StoredSource> {
        if !body.get("found").and_then(Value::as_bool).unwrap_or(false) {
            return None;
        }

        body.get("_source").and_then(Value::as_object).cloned()
    }
}

#[async_trait]
impl DocumentLookup for OpenSearchClient {
    #[instrument(skip(self, fields))]
    async fn fetch_source(
        &self,
        index: &str,
        id: &str,
        fields: &[&str],
    ) -> Result<Option<StoredSource>, SearchError> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            ._source_includes(fields)
            .send()
            .await
            .map_err(|e| SearchError::lookup(e.to_string()))?;

        let status = response.status_code();

        // 404 means the variant has not been indexed yet
        if status.as_u16() == 404 {
            debug!(id = %id, "Document not found");
            return Ok(None);
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Lookup request failed");
            return Err(SearchError::lookup(format!(
                "Lookup failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        Ok(Self::source_from_response(&body))
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    async fn bulk(&self, index: &str, lines: Vec<String>) -> Result<BulkSummary, SearchError> {
        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(lines)
            .send()
            .await
            .map_err(|e| SearchError::bulk_index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchError::bulk_index(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let summary = BulkSummary::from_response(&body);
        debug!(
            total = summary.total,
            failed = summary.failed,
            "Bulk request completed"
        );

        Ok(summary)
    }

    #[instrument(skip(self))]
    async fn set_refresh_interval(&self, index: &str, interval: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .put_settings(IndicesPutSettingsParts::Index(&[index]))
            .body(refresh_settings(interval))
            .send()
            .await
            .map_err(|e| SearchError::settings(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchError::settings(format!(
                "Settings update failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %index, interval = %interval, "Updated refresh interval");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .wait_for_status(WaitForStatus::Yellow)
            .send()
            .await
            .map_err(|e| SearchError::health(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let status = body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("red");

        debug!(status = %status, "Cluster health");
        Ok(status == "green" || status == "yellow")
    }
}
