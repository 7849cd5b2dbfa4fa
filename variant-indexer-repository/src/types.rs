//! Request and response types for backend operations.

use serde_json::{Map, Value};

/// Partial `_source` of a stored document, as returned by a lookup.
pub type StoredSource = Map<String, Value>;

/// Summary of a bulk request containing aggregate statistics.
///
/// The bulk API answers 200 even when individual items fail, so the
/// per-item outcome has to be read from the response body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkSummary {
    /// Total number of items in the request.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Error reasons of the failed items (first few only).
    pub errors: Vec<String>,
}

/// Maximum number of item error reasons retained in a summary.
const MAX_REPORTED_ERRORS: usize = 10;

impl BulkSummary {
    /// Build a summary from a bulk API response body.
    pub fn from_response(body: &Value) -> Self {
        let empty = Vec::new();
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .unwrap_or(&empty);

        let mut summary = BulkSummary {
            total: items.len(),
            ..Default::default()
        };

        for item in items {
            // Each item is keyed by its action: {"index": {...}} or {"update": {...}}
            let error = item
                .as_object()
                .and_then(|obj| obj.values().next())
                .and_then(|outcome| outcome.get("error"));

            match error {
                Some(error) => {
                    summary.failed += 1;
                    if summary.errors.len() < MAX_REPORTED_ERRORS {
                        let reason = error
                            .get("reason")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| error.to_string());
                        summary.errors.push(reason);
                    }
                }
                None => summary.succeeded += 1,
            }
        }

        summary
    }

    /// Whether every item in the request succeeded.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_all_succeeded() {
        let body = json!({
            "took": 3,
            "errors": false,
            "items": [
                {"index": {"_id": "a", "status": 201}},
                {"update": {"_id": "b", "status": 200}}
            ]
        });

        let summary = BulkSummary::from_response(&body);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert!(summary.is_success());
    }

    #[test]
    fn test_summary_counts_item_errors() {
        let body = json!({
            "errors": true,
            "items": [
                {"index": {"_id": "a", "status": 201}},
                {"index": {"_id": "b", "status": 400, "error": {
                    "type": "mapper_parsing_exception",
                    "reason": "failed to parse field [POS]"
                }}}
            ]
        });

        let summary = BulkSummary::from_response(&body);

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.errors, vec!["failed to parse field [POS]".to_string()]);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_summary_empty_body() {
        let summary = BulkSummary::from_response(&json!({}));
        assert_eq!(summary, BulkSummary::default());
    }
}
