//! Field declarations of the mapping description.

use std::collections::HashMap;

use serde::de::{Deserializer, Error as DeError};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Datatype of a target document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldDatatype {
    #[serde(alias = "long", alias = "short", alias = "byte")]
    Integer,
    #[serde(alias = "double", alias = "half_float", alias = "scaled_float")]
    Float,
    Keyword,
    Text,
    Boolean,
    Nested,
}

impl FieldDatatype {
    /// Name used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Keyword => "keyword",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Nested => "nested",
        }
    }
}

/// Annotation-family parser selected by a field's `parser` tag.
///
/// The legacy function names used by older mapping files are accepted as
/// aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum AnnotationParser {
    #[serde(rename = "refgene_detail", alias = "Gene_refGene_parser")]
    RefGeneDetail,
    #[serde(rename = "ensgene_detail", alias = "Gene_ensGene_parser")]
    EnsGeneDetail,
    #[serde(rename = "aachange_refgene", alias = "AAChange_refGene_parser")]
    AaChangeRefGene,
    #[serde(rename = "aachange_ensgene", alias = "AAChange_ensGene_parser")]
    AaChangeEnsGene,
    #[serde(rename = "clinvar", alias = "clinvar_parser")]
    Clinvar,
    #[serde(
        rename = "pipe_join",
        alias = "GTEx_V6_tissue_parser",
        alias = "GTEx_V6_gene_parser",
        alias = "gwasCatalog_parser"
    )]
    PipeJoin,
    #[serde(rename = "chrom", alias = "CHROM_parser")]
    Chrom,
}

impl AnnotationParser {
    /// Whether the parser produces a sequence of nested records rather than
    /// a scalar value.
    pub fn is_nested(&self) -> bool {
        !matches!(self, Self::PipeJoin | Self::Chrom)
    }

    /// Key that groups the records of a gene-family nested path; records of
    /// such paths are pruned by this key.
    pub fn group_key(&self) -> Option<&'static str> {
        match self {
            Self::RefGeneDetail | Self::AaChangeRefGene => Some("refGene_symbol"),
            Self::EnsGeneDetail | Self::AaChangeEnsGene => Some("ensGene_gene_id"),
            Self::Clinvar | Self::PipeJoin | Self::Chrom => None,
        }
    }
}

/// Declaration of one field of the mapping description.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    /// Raw key (INFO key, FORMAT key or fixed column name).
    #[serde(skip)]
    pub name: String,
    pub es_field_name: Option<String>,
    pub es_field_datatype: Option<FieldDatatype>,
    /// Sentinel written before any real value is seen.
    pub null_value: Option<Value>,
    /// Literal value remapping, falling through to the original value.
    #[serde(default)]
    pub value_mapping: Map<String, Value>,
    #[serde(alias = "parse_function")]
    pub parser: Option<AnnotationParser>,
    pub es_nested_path: Option<String>,
    pub shares_nested_path: Option<String>,
    pub parse_with: Option<String>,
    #[serde(default, deserialize_with = "presence_flag")]
    pub is_exists_only: bool,
    #[serde(default, deserialize_with = "presence_flag")]
    pub is_nested_label_field: bool,
    pub overwrites: Option<String>,
    #[serde(default)]
    pub nested_fields: FieldTable,
}

impl FieldSpec {
    /// Name of the document field this entry writes to.
    pub fn target_name(&self) -> &str {
        self.es_field_name.as_deref().unwrap_or(&self.name)
    }

    /// Declared datatype. Undeclared fields are nested when they name a
    /// nested path and keyword otherwise.
    pub fn datatype(&self) -> FieldDatatype {
        match self.es_field_datatype {
            Some(datatype) => datatype,
            None if self.es_nested_path.is_some() || self.shares_nested_path.is_some() => {
                FieldDatatype::Nested
            }
            None => FieldDatatype::Keyword,
        }
    }

    pub fn is_nested(&self) -> bool {
        self.datatype() == FieldDatatype::Nested
    }
}

/// Mapping flags are set by presence: `"is_exists_only": "True"` and
/// `"is_exists_only": true` both enable the flag, `false`/`null` do not.
fn presence_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => false,
        Value::Bool(flag) => flag,
        _ => true,
    })
}

/// Field declarations of one category, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    fields: Vec<FieldSpec>,
    positions: HashMap<String, usize>,
}

impl FieldTable {
    /// Look up a field by raw key.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.positions.get(name).map(|&idx| &self.fields[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Iterate fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn push(&mut self, spec: FieldSpec) {
        match self.positions.get(&spec.name) {
            Some(&idx) => self.fields[idx] = spec,
            None => {
                self.positions.insert(spec.name.clone(), self.fields.len());
                self.fields.push(spec);
            }
        }
    }
}

impl<'de> Deserialize<'de> for FieldTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut table = FieldTable::default();

        for (name, value) in raw {
            let mut spec: FieldSpec = serde_json::from_value(value)
                .map_err(|e| D::Error::custom(format!("field '{}': {}", name, e)))?;
            spec.name = name;
            table.push(spec);
        }

        Ok(table)
    }
}
