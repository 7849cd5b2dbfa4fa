//! Interface definitions for the search backend.
//!
//! This module defines the abstract traits that allow for dependency
//! injection and swappable backend implementations.

mod document_lookup;
mod search_engine_client;

pub use document_lookup::DocumentLookup;
pub use search_engine_client::SearchEngineClient;
