//! Schema registry.
//!
//! Holds the mapping description that drives the field transformer: one
//! [`FieldSpec`] per fixed column, INFO key and FORMAT key, plus the derived
//! indexes the transformer and sample extractor consult for every record.
//!
//! ## Mapping description
//!
//! ```json
//! {
//!   "FIXED_FIELDS": { "QUAL": { "es_field_datatype": "nested" } },
//!   "INFO_FIELDS": {
//!     "Gene.refGene": {
//!       "es_field_datatype": "nested",
//!       "shares_nested_path": "AAChange.refGene",
//!       "parser": "refgene_detail"
//!     },
//!     "GeneDetail.refGene": {
//!       "es_field_datatype": "nested",
//!       "parse_with": "Gene.refGene"
//!     },
//!     "AAChange.refGene": {
//!       "es_field_datatype": "nested",
//!       "es_nested_path": "refGene",
//!       "parser": "aachange_refgene"
//!     }
//!   },
//!   "FORMAT_FIELDS": { "nested_fields": { "DP": { "es_field_datatype": "integer" } } },
//!   "SKIP_FIELDS": ["ALLELE_END", "ANNOVAR_DATE", "END"]
//! }
//! ```

mod field;

pub use field::{AnnotationParser, FieldDatatype, FieldSpec, FieldTable};

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::SchemaError;

/// INFO keys dropped before transformation unless the mapping lists its own.
pub const DEFAULT_SKIP_FIELDS: [&str; 3] = ["ALLELE_END", "ANNOVAR_DATE", "END"];

/// Fixed columns whose value depends on the run that observed the variant.
pub const RUN_DEPENDENT_FIXED_FIELDS: [&str; 2] = ["FILTER", "QUAL"];

/// INFO QC metrics whose value depends on the run that observed the variant.
pub const RUN_DEPENDENT_INFO_FIELDS: [&str; 14] = [
    "BaseQRankSum",
    "ClippingRankSum",
    "DP",
    "InbreedingCoeff",
    "MLEAC",
    "MLEAF",
    "MQ",
    "MQ0",
    "MQRankSum",
    "QD",
    "ReadPosRankSum",
    "SOR",
    "VQSLOD",
    "culprit",
];

/// Allele count, frequency and total, stored per cohort label when one is set.
pub const COHORT_SCOPED_FIELDS: [(&str, FieldDatatype); 3] = [
    ("AC", FieldDatatype::Integer),
    ("AF", FieldDatatype::Float),
    ("AN", FieldDatatype::Integer),
];

/// Whether an INFO key is one of the run-dependent QC metrics.
pub fn is_run_dependent(key: &str) -> bool {
    RUN_DEPENDENT_INFO_FIELDS.contains(&key)
}

/// Whether an INFO key is stored per cohort label.
pub fn is_cohort_scoped(key: &str) -> bool {
    COHORT_SCOPED_FIELDS.iter().any(|(name, _)| *name == key)
}

#[derive(Debug, Default, Deserialize)]
struct FormatSection {
    #[serde(default)]
    nested_fields: FieldTable,
}

#[derive(Debug, Deserialize)]
struct MappingDescription {
    #[serde(rename = "FIXED_FIELDS", default)]
    fixed_fields: FieldTable,
    #[serde(rename = "INFO_FIELDS", default)]
    info_fields: FieldTable,
    #[serde(rename = "FORMAT_FIELDS", default)]
    format_fields: FormatSection,
    #[serde(rename = "SKIP_FIELDS")]
    skip_fields: Option<Vec<String>>,
}

/// Copy the computed value of `from` onto `to` after all INFO keys ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverwriteRule {
    pub from: String,
    pub to: String,
}

/// Nested path whose records are deduplicated by `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneRule {
    pub path: String,
    pub key: &'static str,
}

/// Validated mapping description with derived lookup indexes.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    fixed: FieldTable,
    info: FieldTable,
    format: FieldTable,
    skip_keys: HashSet<String>,
    int_format_keys: HashSet<String>,
    float_format_keys: HashSet<String>,
    exists_only_keys: HashSet<String>,
    null_defaults: Vec<(String, Value)>,
    overwrites: Vec<OverwriteRule>,
    companions: HashMap<String, String>,
    prune_rules: Vec<PruneRule>,
}

impl SchemaRegistry {
    /// Load and validate a mapping description from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let registry = Self::from_json_str(&content)?;

        info!(
            path = %path.display(),
            info_fields = registry.info.len(),
            format_fields = registry.format.len(),
            "Loaded mapping description"
        );

        Ok(registry)
    }

    /// Parse and validate a mapping description.
    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        let description: MappingDescription = serde_json::from_str(content)?;
        Self::build(description)
    }

    /// Build a registry from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let description: MappingDescription = serde_json::from_value(value)?;
        Self::build(description)
    }

    fn build(description: MappingDescription) -> Result<Self, SchemaError> {
        let MappingDescription {
            fixed_fields,
            info_fields,
            format_fields,
            skip_fields,
        } = description;
        let format = format_fields.nested_fields;

        validate(&info_fields)?;

        let skip_keys = match skip_fields {
            Some(keys) => keys.into_iter().collect(),
            None => DEFAULT_SKIP_FIELDS.iter().map(|k| k.to_string()).collect(),
        };

        // FORMAT keys reuse the INFO datatype when FORMAT_FIELDS does not
        // declare one of their own.
        let mut int_format_keys = HashSet::new();
        let mut float_format_keys = HashSet::new();
        for spec in format.iter().chain(info_fields.iter()) {
            let datatype = match format.get(&spec.name) {
                Some(declared) => declared.datatype(),
                None => spec.datatype(),
            };
            match datatype {
                FieldDatatype::Integer => {
                    int_format_keys.insert(spec.name.clone());
                }
                FieldDatatype::Float => {
                    float_format_keys.insert(spec.name.clone());
                }
                _ => {}
            }
        }

        let exists_only_keys = info_fields
            .iter()
            .filter(|spec| spec.is_exists_only)
            .map(|spec| spec.name.clone())
            .collect();

        let null_defaults = info_fields
            .iter()
            .filter_map(|spec| {
                spec.null_value
                    .as_ref()
                    .map(|value| (spec.target_name().to_string(), value.clone()))
            })
            .collect();

        let overwrites = info_fields
            .iter()
            .filter_map(|spec| {
                let target = info_fields.get(spec.overwrites.as_deref()?)?;
                Some(OverwriteRule {
                    from: spec.target_name().to_string(),
                    to: target.target_name().to_string(),
                })
            })
            .collect();

        let companions = info_fields
            .iter()
            .filter_map(|spec| {
                spec.parse_with
                    .as_ref()
                    .map(|target| (target.clone(), spec.name.clone()))
            })
            .collect();

        let mut prune_rules: Vec<PruneRule> = Vec::new();
        for spec in info_fields.iter() {
            let (Some(parser), Some(path)) = (spec.parser, nested_path(&info_fields, spec)) else {
                continue;
            };
            if let Some(key) = parser.group_key() {
                if !prune_rules.iter().any(|rule| rule.path == path) {
                    prune_rules.push(PruneRule {
                        path: path.to_string(),
                        key,
                    });
                }
            }
        }

        debug!(
            int_format_keys = int_format_keys.len(),
            float_format_keys = float_format_keys.len(),
            prune_rules = prune_rules.len(),
            "Derived schema indexes"
        );

        Ok(Self {
            fixed: fixed_fields,
            info: info_fields,
            format,
            skip_keys,
            int_format_keys,
            float_format_keys,
            exists_only_keys,
            null_defaults,
            overwrites,
            companions,
            prune_rules,
        })
    }

    pub fn fixed_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fixed.get(name)
    }

    pub fn info_field(&self, name: &str) -> Option<&FieldSpec> {
        self.info.get(name)
    }

    pub fn format_field(&self, name: &str) -> Option<&FieldSpec> {
        self.format.get(name)
    }

    /// INFO fields in declaration order.
    pub fn info_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.info.iter()
    }

    /// Whether an INFO key is dropped before transformation.
    pub fn is_skipped(&self, key: &str) -> bool {
        self.skip_keys.contains(key)
    }

    pub fn skip_keys(&self) -> &HashSet<String> {
        &self.skip_keys
    }

    pub fn is_exists_only(&self, key: &str) -> bool {
        self.exists_only_keys.contains(key)
    }

    pub fn int_format_keys(&self) -> &HashSet<String> {
        &self.int_format_keys
    }

    pub fn float_format_keys(&self) -> &HashSet<String> {
        &self.float_format_keys
    }

    /// Datatype used to decode a FORMAT value.
    pub fn format_datatype(&self, key: &str) -> FieldDatatype {
        if self.int_format_keys.contains(key) {
            FieldDatatype::Integer
        } else if self.float_format_keys.contains(key) {
            FieldDatatype::Float
        } else {
            FieldDatatype::Keyword
        }
    }

    /// Target names with a sentinel default, paired with the sentinel.
    pub fn null_defaults(&self) -> &[(String, Value)] {
        &self.null_defaults
    }

    pub fn overwrites(&self) -> &[OverwriteRule] {
        &self.overwrites
    }

    /// Field whose value is passed as companion when parsing `key`.
    pub fn companion_of(&self, key: &str) -> Option<&str> {
        self.companions.get(key).map(String::as_str)
    }

    pub fn prune_rules(&self) -> &[PruneRule] {
        &self.prune_rules
    }

    /// Nested path a field writes its records into.
    pub fn nested_path<'a>(&'a self, spec: &'a FieldSpec) -> Option<&'a str> {
        nested_path(&self.info, spec)
    }

    /// Datatype of the `{F}_value` sub-field of a run-dependent field.
    pub fn run_dependent_datatype(&self, field: &str) -> FieldDatatype {
        let Some(spec) = self.info.get(field) else {
            return FieldDatatype::Keyword;
        };

        let value_field = format!("{}_value", field);
        match spec.nested_fields.get(&value_field) {
            Some(sub) => sub.datatype(),
            None if !spec.is_nested() => spec.datatype(),
            None => FieldDatatype::Keyword,
        }
    }
}

fn nested_path<'a>(info: &'a FieldTable, spec: &'a FieldSpec) -> Option<&'a str> {
    match &spec.shares_nested_path {
        Some(peer) => info.get(peer)?.es_nested_path.as_deref(),
        None => spec.es_nested_path.as_deref(),
    }
}

fn validate(info: &FieldTable) -> Result<(), SchemaError> {
    for spec in info.iter() {
        let references = [
            ("shares the nested path of", &spec.shares_nested_path),
            ("is parsed with", &spec.parse_with),
            ("overwrites", &spec.overwrites),
        ];
        for (relation, target) in references {
            if let Some(target) = target {
                if !info.contains(target) {
                    return Err(SchemaError::UnresolvedReference {
                        field: spec.name.clone(),
                        relation,
                        target: target.clone(),
                    });
                }
            }
        }

        if let Some(peer) = &spec.shares_nested_path {
            if info.get(peer).and_then(|p| p.es_nested_path.as_ref()).is_none() {
                return Err(SchemaError::MissingNestedPath {
                    field: spec.name.clone(),
                    peer: peer.clone(),
                });
            }
            if spec.parser.is_none() {
                return Err(SchemaError::invalid_field(
                    &spec.name,
                    "shares a nested path but declares no parser",
                ));
            }
        }

        if let Some(parser) = spec.parser {
            if parser.is_nested() != spec.is_nested() {
                return Err(SchemaError::invalid_field(
                    &spec.name,
                    format!(
                        "parser {:?} cannot produce a {} value",
                        parser,
                        spec.datatype().as_str()
                    ),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapping() -> Value {
        json!({
            "FIXED_FIELDS": {
                "QUAL": {"es_field_datatype": "nested"}
            },
            "INFO_FIELDS": {
                "Func.refGene": {
                    "es_field_name": "refGene_function",
                    "es_field_datatype": "keyword",
                    "null_value": "NA"
                },
                "Gene.refGene": {
                    "es_field_datatype": "nested",
                    "shares_nested_path": "AAChange.refGene",
                    "parser": "refgene_detail"
                },
                "GeneDetail.refGene": {
                    "es_field_datatype": "nested",
                    "parse_with": "Gene.refGene"
                },
                "AAChange.refGene": {
                    "es_field_datatype": "nested",
                    "es_nested_path": "refGene",
                    "parser": "aachange_refgene"
                },
                "DP": {
                    "es_field_datatype": "nested",
                    "nested_fields": {
                        "DP_label": {"es_field_datatype": "keyword"},
                        "DP_value": {"es_field_datatype": "integer"}
                    }
                },
                "MQ": {"es_field_datatype": "float"},
                "snp138NonFlagged": {
                    "es_field_datatype": "boolean",
                    "is_exists_only": true
                },
                "cosmic70_ID": {
                    "es_field_name": "cosmic_ID",
                    "es_field_datatype": "keyword",
                    "overwrites": "Func.refGene"
                }
            },
            "FORMAT_FIELDS": {
                "nested_fields": {
                    "GT": {"es_field_datatype": "keyword"},
                    "AD": {"es_field_datatype": "integer"},
                    "GQ": {"es_field_datatype": "float"}
                }
            }
        })
    }

    #[test]
    fn test_derived_indexes() {
        let registry = SchemaRegistry::from_value(mapping()).unwrap();

        assert!(registry.int_format_keys().contains("AD"));
        assert!(registry.float_format_keys().contains("GQ"));
        assert!(registry.float_format_keys().contains("MQ"));
        assert_eq!(registry.format_datatype("GT"), FieldDatatype::Keyword);
        assert_eq!(registry.format_datatype("PL"), FieldDatatype::Keyword);

        assert!(registry.is_exists_only("snp138NonFlagged"));
        assert_eq!(
            registry.null_defaults(),
            &[("refGene_function".to_string(), json!("NA"))]
        );
        assert_eq!(
            registry.overwrites(),
            &[OverwriteRule {
                from: "cosmic_ID".to_string(),
                to: "refGene_function".to_string()
            }]
        );
        assert_eq!(registry.companion_of("Gene.refGene"), Some("GeneDetail.refGene"));
        assert_eq!(
            registry.prune_rules(),
            &[PruneRule {
                path: "refGene".to_string(),
                key: "refGene_symbol"
            }]
        );
    }

    #[test]
    fn test_nested_path_resolution() {
        let registry = SchemaRegistry::from_value(mapping()).unwrap();

        // a spec owned outside the registry still resolves through its peer
        let gene = registry.info_field("Gene.refGene").unwrap().clone();
        assert_eq!(registry.nested_path(&gene), Some("refGene"));

        let aa_change = registry.info_field("AAChange.refGene").unwrap();
        assert_eq!(registry.nested_path(aa_change), Some("refGene"));

        let func = registry.info_field("Func.refGene").unwrap();
        assert_eq!(registry.nested_path(func), None);
    }

    #[test]
    fn test_default_skip_fields() {
        let registry = SchemaRegistry::from_value(mapping()).unwrap();
        assert!(registry.is_skipped("ANNOVAR_DATE"));
        assert!(registry.is_skipped("END"));
        assert!(!registry.is_skipped("DP"));

        let mut custom = mapping();
        custom["SKIP_FIELDS"] = json!(["OLD_VARIANT"]);
        let registry = SchemaRegistry::from_value(custom).unwrap();
        assert!(registry.is_skipped("OLD_VARIANT"));
        assert!(!registry.is_skipped("END"));
    }

    #[test]
    fn test_run_dependent_datatype() {
        let registry = SchemaRegistry::from_value(mapping()).unwrap();
        assert_eq!(registry.run_dependent_datatype("DP"), FieldDatatype::Integer);
        assert_eq!(registry.run_dependent_datatype("MQ"), FieldDatatype::Float);
        assert_eq!(registry.run_dependent_datatype("culprit"), FieldDatatype::Keyword);
    }

    #[test]
    fn test_unresolved_parse_with() {
        let mut broken = mapping();
        broken["INFO_FIELDS"]["GeneDetail.refGene"]["parse_with"] = json!("Gene.nowhere");

        let err = SchemaRegistry::from_value(broken).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnresolvedReference { ref target, .. } if target == "Gene.nowhere"
        ));
    }

    #[test]
    fn test_shared_path_without_nested_path() {
        let mut broken = mapping();
        broken["INFO_FIELDS"]["Gene.refGene"]["shares_nested_path"] = json!("MQ");

        let err = SchemaRegistry::from_value(broken).unwrap_err();
        assert!(matches!(err, SchemaError::MissingNestedPath { .. }));
    }

    #[test]
    fn test_scalar_parser_on_nested_field() {
        let mut broken = mapping();
        broken["INFO_FIELDS"]["AAChange.refGene"]["parser"] = json!("pipe_join");

        let err = SchemaRegistry::from_value(broken).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { .. }));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            SchemaRegistry::from_json_str("{not json"),
            Err(SchemaError::Parse(_))
        ));
    }
}
