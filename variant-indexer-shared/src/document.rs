//! Variant document model.
//!
//! A [`VariantDocument`] is what gets persisted for one VCF record. The fixed
//! columns are typed; every annotation produced from the mapping description
//! lives in the flattened `fields` map, which keeps insertion order so the
//! serialized document follows the mapping's declaration order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of allele characters kept in the `Variant` key.
const VARIANT_KEY_ALLELE_LEN: usize = 10;

/// One entry of a nested group: a transcript, a disease association, or a
/// cohort-labelled QC value.
pub type NestedRecord = Map<String, Value>;

/// Coarse variant classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariantType {
    /// Single nucleotide variant.
    Snv,
    /// Anything else, including missing alleles.
    Indel,
}

impl VariantType {
    /// Classify a REF/ALT pair.
    ///
    /// A missing ALT (`.`) is always an INDEL; otherwise both alleles must be
    /// a single base (and not `.`) to count as an SNV.
    pub fn classify(ref_allele: &str, alt: &str) -> Self {
        if alt == "." {
            return Self::Indel;
        }

        if ref_allele.len() == 1 && alt.len() == 1 && ref_allele != "." {
            Self::Snv
        } else {
            Self::Indel
        }
    }
}

/// Build the human-readable `Variant` key: `CHROM-POS-REF[:10]-ALT[:10]`.
pub fn variant_key(chrom: &str, pos: u64, ref_allele: &str, alt: &str) -> String {
    format!(
        "{}-{}-{}-{}",
        chrom,
        pos,
        truncate(ref_allele, VARIANT_KEY_ALLELE_LEN),
        truncate(alt, VARIANT_KEY_ALLELE_LEN)
    )
}

fn truncate(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Genotype of one sample at one variant.
///
/// FORMAT values are stored under `sample_<FORMAT key>` so they can be
/// flattened next to the sample id in the nested `sample` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleGenotype {
    /// Sample identifier from the VCF header.
    #[serde(rename = "sample_ID")]
    pub sample_id: String,
    /// Cohort label of the run that observed this sample.
    #[serde(
        rename = "sample_label",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub label: Option<String>,
    /// Typed FORMAT values keyed by `sample_<FORMAT key>`.
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl SampleGenotype {
    /// Create a genotype record with no FORMAT values yet.
    pub fn new(sample_id: impl Into<String>, label: Option<String>) -> Self {
        Self {
            sample_id: sample_id.into(),
            label,
            values: Map::new(),
        }
    }

    /// Store a decoded FORMAT value.
    pub fn insert(&mut self, format_key: &str, value: Value) {
        self.values.insert(format!("sample_{}", format_key), value);
    }

    /// Look up a decoded FORMAT value by its raw FORMAT key (e.g. `DP`).
    pub fn get(&self, format_key: &str) -> Option<&Value> {
        self.values.get(&format!("sample_{}", format_key))
    }
}

/// The document persisted for one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDocument {
    #[serde(rename = "CHROM")]
    pub chrom: String,
    #[serde(rename = "POS")]
    pub pos: u64,
    #[serde(rename = "REF")]
    pub ref_allele: String,
    #[serde(rename = "ALT")]
    pub alt: String,
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "VariantType")]
    pub variant_type: VariantType,
    #[serde(rename = "Variant")]
    pub variant: String,
    /// Genotypes of every non-reference sample, across all contributing runs.
    #[serde(rename = "sample", default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<SampleGenotype>,
    /// Annotation and run-dependent fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl VariantDocument {
    /// Create a document for the given coordinates.
    ///
    /// The variant type and key are derived here; an `ID` of `.` is treated as
    /// absent.
    pub fn new(
        chrom: impl Into<String>,
        pos: u64,
        ref_allele: impl Into<String>,
        alt: impl Into<String>,
        id: Option<String>,
    ) -> Self {
        let chrom = chrom.into();
        let ref_allele = ref_allele.into();
        let alt = alt.into();

        Self {
            variant_type: VariantType::classify(&ref_allele, &alt),
            variant: variant_key(&chrom, pos, &ref_allele, &alt),
            id: id.filter(|id| id != "."),
            chrom,
            pos,
            ref_allele,
            alt,
            samples: Vec::new(),
            fields: Map::new(),
        }
    }

    /// Get an annotation field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set an annotation field, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Get a nested group as a slice of records.
    pub fn nested(&self, path: &str) -> Option<&Vec<Value>> {
        self.fields.get(path).and_then(Value::as_array)
    }
}
