//! Error types for the variant indexer repository.

mod search_error;

pub use search_error::SearchError;
