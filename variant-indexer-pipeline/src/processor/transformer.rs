//! Mapping-driven INFO field transformer.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::trace;

use crate::errors::TransformError;
use crate::processor::coerce::coerce;
use crate::processor::info::{InfoAttributes, InfoValue};
use crate::processor::parsers::{prune, AnnotationInput};
use crate::schema::{is_cohort_scoped, is_run_dependent, FieldDatatype, FieldSpec, SchemaRegistry};

/// Applies the schema registry to one record's INFO attributes.
///
/// Produces the annotation part of a variant document: scalar fields under
/// their target names and nested groups under their nested paths, in mapping
/// declaration order. Run-dependent fields are left to the merge engine.
#[derive(Debug, Clone)]
pub struct FieldTransformer {
    schema: Arc<SchemaRegistry>,
}

impl FieldTransformer {
    pub fn new(schema: Arc<SchemaRegistry>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    /// Transform INFO attributes into annotation fields.
    ///
    /// With a cohort `label`, the cohort-scoped AC/AF/AN fields are skipped
    /// here since they are stored under labelled names.
    pub fn transform(
        &self,
        info: &InfoAttributes,
        label: Option<&str>,
    ) -> Result<Map<String, Value>, TransformError> {
        let mut content = Map::new();

        for (target, sentinel) in self.schema.null_defaults() {
            content.insert(target.clone(), sentinel.clone());
        }

        for spec in self.schema.info_fields() {
            let key = spec.name.as_str();
            if self.schema.is_skipped(key)
                || spec.is_nested_label_field
                || is_run_dependent(key)
                || (label.is_some() && is_cohort_scoped(key))
            {
                continue;
            }

            let Some(value) = info.get(key) else {
                continue;
            };

            if spec.is_exists_only {
                content.insert(spec.target_name().to_string(), Value::Bool(true));
                continue;
            }

            // literal nan means missing for every datatype
            if value.as_text() == Some("nan") {
                continue;
            }

            let text = match value {
                InfoValue::Text(text) => text.as_str(),
                InfoValue::Flag if spec.datatype() == FieldDatatype::Boolean => {
                    content.insert(spec.target_name().to_string(), Value::Bool(true));
                    continue;
                }
                InfoValue::Flag => {
                    trace!(field = key, "Ignoring flag on non-boolean field");
                    continue;
                }
            };

            match spec.datatype() {
                FieldDatatype::Nested => self.apply_nested(spec, text, info, &mut content)?,
                FieldDatatype::Keyword | FieldDatatype::Text => {
                    content.insert(spec.target_name().to_string(), keyword_value(spec, text));
                }
                datatype => {
                    if let Some(coerced) = coerce(key, text, datatype)? {
                        content.insert(spec.target_name().to_string(), coerced);
                    }
                }
            }
        }

        for rule in self.schema.overwrites() {
            if let Some(value) = content.get(&rule.from).cloned() {
                content.insert(rule.to.clone(), value);
            }
        }

        for rule in self.schema.prune_rules() {
            if let Some(Value::Array(records)) = content.remove(&rule.path) {
                content.insert(rule.path.clone(), Value::Array(prune(rule.key, records)));
            }
        }

        Ok(content)
    }

    /// Parse a nested annotation and append its records to the field's path.
    ///
    /// Fields without a parser are companions consumed by another field's
    /// parser and contribute nothing on their own.
    fn apply_nested(
        &self,
        spec: &FieldSpec,
        value: &str,
        info: &InfoAttributes,
        content: &mut Map<String, Value>,
    ) -> Result<(), TransformError> {
        let (Some(parser), Some(path)) = (spec.parser, self.schema.nested_path(spec)) else {
            return Ok(());
        };

        let companion = self
            .schema
            .companion_of(&spec.name)
            .and_then(|companion| info.text(companion));
        let input = AnnotationInput {
            value,
            companion,
            info,
        };
        let records = parser.parse_nested(&input)?;

        let entry = content
            .entry(path.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(existing) = entry {
            existing.extend(records.into_iter().map(Value::Object));
        }

        Ok(())
    }
}

/// Value mapping lookup, then the optional scalar parser.
fn keyword_value(spec: &FieldSpec, text: &str) -> Value {
    let mapped = match spec.value_mapping.get(text) {
        Some(Value::String(mapped)) => mapped.as_str(),
        Some(other) => return other.clone(),
        None => text,
    };

    match spec.parser {
        Some(parser) => Value::String(parser.parse_scalar(mapped)),
        None => Value::String(mapped.to_string()),
    }
}
