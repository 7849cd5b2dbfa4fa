//! Errors raised while transforming a single record.

use thiserror::Error;

/// Record-level transformation errors.
///
/// The offending record is logged and skipped; the run continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// A value could not be coerced to the field's datatype.
    #[error("Field '{field}' has invalid value '{value}' for datatype {datatype}")]
    InvalidValue {
        field: String,
        value: String,
        datatype: &'static str,
    },

    /// An AAChange entry does not have 3, 4 or 5 colon-separated fields.
    #[error("AAChange entry '{entry}' has {count} fields, expected 3, 4 or 5")]
    AaChangeFieldCount { entry: String, count: usize },

    /// A clinvar list required by the clinvar parser is absent.
    #[error("clinvar list '{0}' is missing")]
    ClinvarMissingList(String),

    /// The clinvar lists do not have the same length.
    #[error("clinvar list '{list}' has {found} entries, expected {expected}")]
    ClinvarLengthMismatch {
        list: String,
        expected: usize,
        found: usize,
    },

    /// POS is not a positive integer.
    #[error("Invalid position '{0}'")]
    InvalidPosition(String),

    /// The FORMAT column does not declare GT.
    #[error("FORMAT '{0}' has no GT field")]
    MissingGenotype(String),
}

impl TransformError {
    /// Create an error for a value that is not a valid integer.
    pub fn invalid_integer(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            datatype: "integer",
        }
    }

    /// Create an error for a value that is not a valid float.
    pub fn invalid_float(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            datatype: "float",
        }
    }

    /// Create an error for a value that is not a valid boolean.
    pub fn invalid_boolean(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            datatype: "boolean",
        }
    }
}
