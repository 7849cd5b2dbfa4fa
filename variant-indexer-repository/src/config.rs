//! Backend target configuration.

use url::Url;

use crate::errors::SearchError;

/// Default backend port when the URL does not carry one.
const DEFAULT_PORT: u16 = 9200;

/// Where a run's documents are written: backend host/port plus the index and
/// document type every batch is submitted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    /// URL scheme (`http` or `https`).
    pub scheme: String,
    /// Backend host name.
    pub host: String,
    /// Backend port.
    pub port: u16,
    /// Target index name.
    pub index: String,
    /// Target document type name.
    pub doc_type: String,
}

impl BackendTarget {
    /// Create a target from explicit parts.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        index: impl Into<String>,
        doc_type: impl Into<String>,
    ) -> Self {
        Self {
            scheme: "http".to_string(),
            host: host.into(),
            port,
            index: index.into(),
            doc_type: doc_type.into(),
        }
    }

    /// Create a target from a backend URL such as `http://localhost:9200`.
    pub fn from_url(
        url: &str,
        index: impl Into<String>,
        doc_type: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let parsed = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| SearchError::connection(format!("URL has no host: {}", url)))?;

        Ok(Self {
            scheme: parsed.scheme().to_string(),
            host: host.to_string(),
            port: parsed.port_or_known_default().unwrap_or(DEFAULT_PORT),
            index: index.into(),
            doc_type: doc_type.into(),
        })
    }

    /// Base URL of the backend, e.g. `http://localhost:9200`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_with_port() {
        let target = BackendTarget::from_url("http://es.local:9201", "variants", "wes").unwrap();

        assert_eq!(target.host, "es.local");
        assert_eq!(target.port, 9201);
        assert_eq!(target.index, "variants");
        assert_eq!(target.doc_type, "wes");
        assert_eq!(target.base_url(), "http://es.local:9201");
    }

    #[test]
    fn test_from_url_default_port() {
        let target = BackendTarget::from_url("https://search.example.org", "v", "_doc").unwrap();

        assert_eq!(target.scheme, "https");
        assert_eq!(target.port, 443);
    }

    #[test]
    fn test_from_url_invalid() {
        assert!(BackendTarget::from_url("not a url", "v", "_doc").is_err());
    }
}
