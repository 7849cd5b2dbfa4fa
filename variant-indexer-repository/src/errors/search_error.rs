//! Search error types.
//!
//! This module defines the error types that can occur while talking to the
//! search backend.

use thiserror::Error;

/// Errors that can occur during search backend operations.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// Failed to establish connection to the search backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Looking up an existing document failed.
    #[error("Lookup error: {0}")]
    LookupError(String),

    /// Bulk operation had failures.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to change index settings.
    #[error("Settings error: {0}")]
    SettingsError(String),

    /// The cluster did not report a usable health status.
    #[error("Health error: {0}")]
    HealthError(String),

    /// Failed to parse response from the search backend.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl SearchError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a lookup error.
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::LookupError(msg.into())
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a settings error.
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::SettingsError(msg.into())
    }

    /// Create a health error.
    pub fn health(msg: impl Into<String>) -> Self {
        Self::HealthError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Whether retrying the same request may succeed (transient failures).
    pub fn is_retryable(&self) -> bool {
        match self {
            // Connection errors are retryable
            SearchError::ConnectionError(_) => true,
            // Parse errors might be transient (e.g., server temporarily unavailable)
            SearchError::ParseError(_) => true,
            SearchError::BulkIndexError(msg) | SearchError::LookupError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("rate limit")
                    || msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("503")
                    || msg_lower.contains("429")
            }
            SearchError::SettingsError(_) | SearchError::HealthError(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SearchError::connection("refused").is_retryable());
        assert!(SearchError::bulk_index("status 429: too many requests").is_retryable());
        assert!(SearchError::bulk_index("Request timeout").is_retryable());
        assert!(!SearchError::bulk_index("mapper_parsing_exception").is_retryable());
        assert!(!SearchError::settings("index not found").is_retryable());
    }
}
