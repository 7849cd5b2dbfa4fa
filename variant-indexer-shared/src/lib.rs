//! # Variant Indexer Shared
//!
//! Types shared between the pipeline and the repository crates: the variant
//! document persisted in the search backend, its per-sample genotype records,
//! and the stable document identity.

pub mod document;
pub mod identity;

pub use document::{variant_key, NestedRecord, SampleGenotype, VariantDocument, VariantType};
pub use identity::compute_id;
