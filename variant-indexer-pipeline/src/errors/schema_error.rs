//! Errors raised while loading the mapping description.

use thiserror::Error;

/// Configuration errors in the mapping description.
///
/// These are raised before any record is read.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The mapping file could not be read.
    #[error("Failed to read mapping description: {0}")]
    Read(#[from] std::io::Error),

    /// The mapping file is not a valid mapping description.
    #[error("Invalid mapping description: {0}")]
    Parse(String),

    /// A field refers to a field that is not declared.
    #[error("Field '{field}' {relation} undeclared field '{target}'")]
    UnresolvedReference {
        field: String,
        relation: &'static str,
        target: String,
    },

    /// A field shares the nested path of a peer that declares none.
    #[error("Field '{field}' shares the nested path of '{peer}', which has no es_nested_path")]
    MissingNestedPath { field: String, peer: String },

    /// A field declaration is internally inconsistent.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl SchemaError {
    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
