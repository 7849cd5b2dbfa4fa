//! Existing-document lookup used by update-mode imports.

use async_trait::async_trait;

use crate::errors::SearchError;
use crate::types::StoredSource;

/// Looks up the stored source of an already indexed variant.
///
/// Update-mode imports issue one lookup per candidate record from the
/// parsing task, so this is kept behind a trait: a batched or caching
/// implementation can be swapped in without touching merge logic.
#[async_trait]
pub trait DocumentLookup: Send + Sync {
    /// Fetch selected source fields of a document.
    ///
    /// # Arguments
    ///
    /// * `index` - Index holding the document
    /// * `id` - Document id
    /// * `fields` - Source fields to include in the response
    ///
    /// # Returns
    ///
    /// * `Ok(Some(source))` - The requested fields of the stored document
    /// * `Ok(None)` - If no document with this id exists
    /// * `Err(SearchError)` - If the lookup fails
    async fn fetch_source(
        &self,
        index: &str,
        id: &str,
        fields: &[&str],
    ) -> Result<Option<StoredSource>, SearchError>;
}
