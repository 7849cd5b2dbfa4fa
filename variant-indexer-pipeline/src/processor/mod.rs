//! Processor module for the variant indexer pipeline.
//!
//! Decodes raw VCF records into candidate variants: typed coordinates, the
//! INFO attribute set and the non-reference sample genotypes. The
//! mapping-driven [`FieldTransformer`] turns INFO attributes into annotation
//! fields when a fresh document is built.

mod coerce;
pub mod info;
pub mod parsers;
pub mod samples;
mod transformer;

pub use coerce::coerce;
pub use info::{InfoAttributes, InfoValue};
pub use samples::extract_samples;
pub use transformer::FieldTransformer;

use std::sync::Arc;

use tracing::{instrument, trace};
use variant_indexer_shared::SampleGenotype;

use crate::errors::TransformError;
use crate::reader::RawVariantRecord;
use crate::schema::SchemaRegistry;

/// One record decoded far enough for the merge engine to act on it.
#[derive(Debug, Clone)]
pub struct CandidateVariant {
    pub line_number: usize,
    pub chrom: String,
    pub pos: u64,
    pub ref_allele: String,
    pub alt: String,
    pub id: Option<String>,
    pub filter: String,
    /// `None` when QUAL is `.` or NaN.
    pub qual: Option<f64>,
    pub info: InfoAttributes,
    pub samples: Vec<SampleGenotype>,
}

/// Decodes raw records into [`CandidateVariant`]s.
#[derive(Debug, Clone)]
pub struct VariantProcessor {
    schema: Arc<SchemaRegistry>,
    label: Option<String>,
}

impl VariantProcessor {
    /// Create a processor for a run with an optional cohort label.
    pub fn new(schema: Arc<SchemaRegistry>, label: Option<String>) -> Self {
        Self { schema, label }
    }

    /// Decode one raw record.
    #[instrument(skip(self, record), fields(line = record.line_number()))]
    pub fn prepare(&self, record: &RawVariantRecord) -> Result<CandidateVariant, TransformError> {
        let pos = record
            .pos()
            .parse::<u64>()
            .ok()
            .filter(|pos| *pos > 0)
            .ok_or_else(|| TransformError::InvalidPosition(record.pos().to_string()))?;

        let info = InfoAttributes::parse(record.info(), self.schema.skip_keys());
        let samples = extract_samples(record, &self.schema, self.label.as_deref())?;
        let qual = parse_qual(record.qual())?;

        trace!(
            info_entries = info.len(),
            samples = samples.len(),
            "Prepared candidate variant"
        );

        Ok(CandidateVariant {
            line_number: record.line_number(),
            chrom: record.chrom().to_string(),
            pos,
            ref_allele: record.ref_allele().to_string(),
            alt: record.alt().to_string(),
            id: Some(record.id().to_string()).filter(|id| id != "."),
            filter: record.filter().to_string(),
            qual,
            info,
            samples,
        })
    }
}

fn parse_qual(raw: &str) -> Result<Option<f64>, TransformError> {
    if raw == "." {
        return Ok(None);
    }

    let qual = raw
        .parse::<f64>()
        .map_err(|_| TransformError::invalid_float("QUAL", raw))?;
    Ok(qual.is_finite().then_some(qual))
}
