//! Errors raised while reading a VCF stream.

use thiserror::Error;

/// Structural errors in the VCF stream.
///
/// Any of these aborts the run, since no later record can be trusted.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// Underlying IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A data line appeared before the `#CHROM` header line.
    #[error("Data line {line} found before the #CHROM header")]
    HeaderNotFound { line: usize },

    /// A data line does not have one value per header column.
    #[error("Line {line} has {found} columns, header declares {expected}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// The header lacks a mandatory column.
    #[error("Header is missing required column '{0}'")]
    MissingColumn(String),
}
