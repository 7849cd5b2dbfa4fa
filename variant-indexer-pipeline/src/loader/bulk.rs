//! Bulk action serialization.

use serde_json::{json, Value};
use variant_indexer_repository::StoredSource;
use variant_indexer_shared::VariantDocument;

use crate::errors::PipelineError;
use crate::merge::MergeOutcome;

/// One bulk unit pair: an action header followed by its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkAction {
    header: Value,
    payload: Value,
}

impl BulkAction {
    /// `{"index":{"_id":id}}` followed by the full document.
    pub fn index(id: &str, document: &VariantDocument) -> Result<Self, PipelineError> {
        Ok(Self {
            header: json!({"index": {"_id": id}}),
            payload: serde_json::to_value(document)?,
        })
    }

    /// `{"update":{"_id":id}}` followed by `{"doc": partial}`.
    pub fn update(id: &str, partial: StoredSource) -> Self {
        Self {
            header: json!({"update": {"_id": id}}),
            payload: json!({"doc": Value::Object(partial)}),
        }
    }

    pub fn from_outcome(outcome: &MergeOutcome) -> Result<Self, PipelineError> {
        match outcome {
            MergeOutcome::Create { id, document } => Self::index(id, document),
            MergeOutcome::Update { id, partial } => Ok(Self::update(id, partial.clone())),
        }
    }

    pub fn header(&self) -> &Value {
        &self.header
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The two newline-free lines written to a batch file.
    pub fn lines(&self) -> Result<[String; 2], PipelineError> {
        Ok([
            serde_json::to_string(&self.header)?,
            serde_json::to_string(&self.payload)?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_action() {
        let document = VariantDocument::new("1", 100, "A", "T", None);
        let action = BulkAction::index("abc", &document).unwrap();

        let [header, payload] = action.lines().unwrap();
        assert_eq!(header, r#"{"index":{"_id":"abc"}}"#);
        assert!(payload.starts_with(r#"{"CHROM":"1","POS":100,"REF":"A","ALT":"T""#));
    }

    #[test]
    fn test_update_action_wraps_doc() {
        let mut partial = StoredSource::new();
        partial.insert("AC_case".to_string(), json!(2));

        let action = BulkAction::update("abc", partial);

        assert_eq!(action.header(), &json!({"update": {"_id": "abc"}}));
        assert_eq!(action.payload(), &json!({"doc": {"AC_case": 2}}));
    }
}
