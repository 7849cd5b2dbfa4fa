//! Identity and merge engine.
//!
//! Every candidate variant gets a content-independent id. In update mode the
//! stored document with that id is looked up: when found, the run's samples
//! and labelled run-dependent values are appended to it; otherwise, and
//! always outside update mode, a fresh document is built.

mod context;

pub use context::{RunContext, NO_LABEL};

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument};
use variant_indexer_repository::{DocumentLookup, StoredSource};
use variant_indexer_shared::{compute_id, NestedRecord, VariantDocument};

use crate::counters::ProgressCounters;
use crate::errors::PipelineError;
use crate::processor::{coerce, CandidateVariant, FieldTransformer};
use crate::schema::{COHORT_SCOPED_FIELDS, RUN_DEPENDENT_INFO_FIELDS};

/// Document field holding sample genotypes.
pub const SAMPLE_FIELD: &str = "sample";

/// Result of merging one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Index a complete new document.
    Create { id: String, document: VariantDocument },
    /// Replace the listed fields of an existing document.
    Update { id: String, partial: StoredSource },
}

impl MergeOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Create { id, .. } | Self::Update { id, .. } => id,
        }
    }
}

/// Decides create vs update for each candidate and builds its payload.
pub struct MergeEngine {
    transformer: FieldTransformer,
    lookup: Arc<dyn DocumentLookup>,
    context: RunContext,
}

impl MergeEngine {
    pub fn new(
        transformer: FieldTransformer,
        lookup: Arc<dyn DocumentLookup>,
        context: RunContext,
    ) -> Self {
        Self {
            transformer,
            lookup,
            context,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Source fields fetched for an existing document.
    pub fn lookup_fields() -> Vec<&'static str> {
        let mut fields = vec!["FILTER", "QUAL"];
        fields.extend(RUN_DEPENDENT_INFO_FIELDS);
        fields.push(SAMPLE_FIELD);
        fields
    }

    /// Merge one candidate and update the run counters.
    #[instrument(skip(self, candidate, counters), fields(line = candidate.line_number))]
    pub async fn resolve(
        &self,
        candidate: CandidateVariant,
        counters: &mut ProgressCounters,
    ) -> Result<MergeOutcome, PipelineError> {
        let id = compute_id(
            &candidate.chrom,
            candidate.pos,
            &candidate.ref_allele,
            &candidate.alt,
            &self.context.index,
            &self.context.doc_type,
        );

        if self.context.update {
            let existing = self
                .lookup
                .fetch_source(&self.context.index, &id, &Self::lookup_fields())
                .await?;

            if let Some(source) = existing {
                let partial = self.merge_into(source, candidate)?;
                counters.record_updated();
                debug!(id = %id, "Merging into existing document");
                return Ok(MergeOutcome::Update { id, partial });
            }
        }

        let document = self.build(candidate)?;
        counters.record_created();
        Ok(MergeOutcome::Create { id, document })
    }

    /// Build a fresh document.
    fn build(&self, candidate: CandidateVariant) -> Result<VariantDocument, PipelineError> {
        let label = self.context.label();
        let annotations = self.transformer.transform(&candidate.info, label)?;
        let run_entries = self.run_entries(&candidate)?;
        let cohort_fields = self.cohort_fields(&candidate)?;

        let CandidateVariant {
            chrom,
            pos,
            ref_allele,
            alt,
            id,
            samples,
            ..
        } = candidate;

        let mut document = VariantDocument::new(chrom, pos, ref_allele, alt, id);
        document.samples = samples;

        for (field, entry) in run_entries {
            document.set(field, Value::Array(vec![Value::Object(entry)]));
        }
        for (field, value) in annotations {
            document.set(field, value);
        }
        for (field, value) in cohort_fields {
            document.set(field, value);
        }

        Ok(document)
    }

    /// Append this run's observations to an existing document's source.
    fn merge_into(
        &self,
        mut source: StoredSource,
        candidate: CandidateVariant,
    ) -> Result<StoredSource, PipelineError> {
        let run_entries = self.run_entries(&candidate)?;
        let cohort_fields = self.cohort_fields(&candidate)?;

        let samples = candidate
            .samples
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        append(&mut source, SAMPLE_FIELD, samples);

        for (field, entry) in run_entries {
            append(&mut source, &field, vec![Value::Object(entry)]);
        }
        for (field, value) in cohort_fields {
            source.insert(field, value);
        }

        Ok(source)
    }

    /// One `{F_label, F_value}` entry per run-dependent value of the record.
    fn run_entries(
        &self,
        candidate: &CandidateVariant,
    ) -> Result<Vec<(String, NestedRecord)>, PipelineError> {
        let mut entries = Vec::new();

        entries.push((
            "FILTER".to_string(),
            self.entry("FILTER", "FILTER_status", Value::String(candidate.filter.clone())),
        ));

        if let Some(value) = candidate.qual.and_then(serde_json::Number::from_f64) {
            entries.push((
                "QUAL".to_string(),
                self.entry("QUAL", "QUAL_score", Value::Number(value)),
            ));
        }

        let schema = self.transformer.schema();
        for field in RUN_DEPENDENT_INFO_FIELDS {
            let Some(raw) = candidate.info.text(field) else {
                continue;
            };
            let datatype = schema.run_dependent_datatype(field);
            if let Some(value) = coerce(field, raw, datatype)? {
                let value_key = format!("{}_value", field);
                entries.push((field.to_string(), self.entry(field, &value_key, value)));
            }
        }

        Ok(entries)
    }

    fn entry(&self, field: &str, value_key: &str, value: Value) -> NestedRecord {
        let mut entry = Map::new();
        if let Some(label) = self.context.label() {
            entry.insert(format!("{}_label", field), Value::String(label.to_string()));
        }
        entry.insert(value_key.to_string(), value);
        entry
    }

    /// `AC_<label>`, `AF_<label>` and `AN_<label>` for labelled runs.
    fn cohort_fields(&self, candidate: &CandidateVariant) -> Result<Vec<(String, Value)>, PipelineError> {
        let Some(label) = self.context.label() else {
            return Ok(Vec::new());
        };

        let mut fields = Vec::new();
        for (name, datatype) in COHORT_SCOPED_FIELDS {
            let Some(raw) = candidate.info.text(name) else {
                continue;
            };
            if let Some(value) = coerce(name, raw, datatype)? {
                fields.push((format!("{}_{}", name, label), value));
            }
        }

        Ok(fields)
    }
}

/// Append values to the array at `field`, creating it when absent.
fn append(source: &mut StoredSource, field: &str, values: Vec<Value>) {
    match source.get_mut(field) {
        Some(Value::Array(existing)) => existing.extend(values),
        _ => {
            source.insert(field.to_string(), Value::Array(values));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::VariantProcessor;
    use crate::reader::{RawVariantRecord, VcfHeader};
    use crate::schema::SchemaRegistry;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use variant_indexer_repository::SearchError;

    struct MockLookup {
        documents: Mutex<HashMap<String, StoredSource>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl MockLookup {
        fn new() -> Self {
            Self {
                documents: Mutex::new(HashMap::new()),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn with(id: &str, source: Value) -> Self {
            let lookup = Self::new();
            if let Value::Object(source) = source {
                lookup.documents.lock().unwrap().insert(id.to_string(), source);
            }
            lookup
        }
    }

    #[async_trait]
    impl DocumentLookup for MockLookup {
        async fn fetch_source(
            &self,
            _index: &str,
            id: &str,
            _fields: &[&str],
        ) -> Result<Option<StoredSource>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SearchError::lookup("connection reset"));
            }
            Ok(self.documents.lock().unwrap().get(id).cloned())
        }
    }

    fn schema() -> Arc<SchemaRegistry> {
        Arc::new(
            SchemaRegistry::from_value(json!({
                "INFO_FIELDS": {
                    "Func.refGene": {"es_field_name": "refGene_function", "es_field_datatype": "keyword"},
                    "AC": {"es_field_datatype": "integer"},
                    "AF": {"es_field_datatype": "float"},
                    "AN": {"es_field_datatype": "integer"},
                    "DP": {
                        "es_field_datatype": "nested",
                        "nested_fields": {"DP_value": {"es_field_datatype": "integer"}}
                    },
                    "QD": {
                        "es_field_datatype": "nested",
                        "nested_fields": {"QD_value": {"es_field_datatype": "float"}}
                    }
                },
                "FORMAT_FIELDS": {"nested_fields": {"DP": {"es_field_datatype": "integer"}}}
            }))
            .unwrap(),
        )
    }

    fn engine(lookup: Arc<dyn DocumentLookup>, label: Option<&str>, update: bool) -> MergeEngine {
        let context = RunContext::new("variants", "wes", label.map(str::to_string), update);
        MergeEngine::new(FieldTransformer::new(schema()), lookup, context)
    }

    fn candidate(label: Option<&str>) -> CandidateVariant {
        let header = VcfHeader::parse("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1").unwrap();
        let record = RawVariantRecord::parse(
            Arc::new(header),
            "1\t100\t.\tA\tT\t50\tPASS\tAC=1;AF=0.5;AN=2;DP=14;QD=nan;Func.refGene=exonic\tGT:DP\t0/1:14",
            5,
        )
        .unwrap();
        VariantProcessor::new(schema(), label.map(str::to_string))
            .prepare(&record)
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_unlabelled() {
        let lookup = Arc::new(MockLookup::new());
        let engine = engine(lookup.clone(), None, false);
        let mut counters = ProgressCounters::new();

        let outcome = engine.resolve(candidate(None), &mut counters).await.unwrap();

        let MergeOutcome::Create { id, document } = outcome else {
            panic!("expected create");
        };
        assert_eq!(id, compute_id("1", 100, "A", "T", "variants", "wes"));
        assert_eq!(document.get("FILTER"), Some(&json!([{"FILTER_status": "PASS"}])));
        assert_eq!(document.get("QUAL"), Some(&json!([{"QUAL_score": 50.0}])));
        assert_eq!(document.get("DP"), Some(&json!([{"DP_value": 14}])));
        assert!(document.get("QD").is_none());
        assert_eq!(document.get("AC"), Some(&json!(1)));
        assert_eq!(document.get("refGene_function"), Some(&json!("exonic")));
        assert_eq!(document.samples.len(), 1);
        // no lookup outside update mode
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        assert_eq!(counters.created, 1);
        assert_eq!(counters.processed, 1);
    }

    #[tokio::test]
    async fn test_create_labelled_uses_cohort_names() {
        let engine = engine(Arc::new(MockLookup::new()), Some("control"), true);
        let mut counters = ProgressCounters::new();

        let outcome = engine.resolve(candidate(Some("control")), &mut counters).await.unwrap();

        let MergeOutcome::Create { document, .. } = outcome else {
            panic!("expected create");
        };
        assert_eq!(
            document.get("FILTER"),
            Some(&json!([{"FILTER_label": "control", "FILTER_status": "PASS"}]))
        );
        assert_eq!(
            document.get("DP"),
            Some(&json!([{"DP_label": "control", "DP_value": 14}]))
        );
        assert_eq!(document.get("AC_control"), Some(&json!(1)));
        assert_eq!(document.get("AF_control"), Some(&json!(0.5)));
        assert!(document.get("AC").is_none());
        assert_eq!(document.samples[0].label.as_deref(), Some("control"));
    }

    #[tokio::test]
    async fn test_update_appends_labelled_entries() {
        let id = compute_id("1", 100, "A", "T", "variants", "wes");
        let stored = json!({
            "FILTER": [{"FILTER_label": "control", "FILTER_status": "LowQual"}],
            "QUAL": [{"QUAL_label": "control", "QUAL_score": 20.0}],
            "sample": [{"sample_ID": "C1", "sample_GT": "1/1", "sample_label": "control"}]
        });
        let lookup = Arc::new(MockLookup::with(&id, stored));
        let engine = engine(lookup.clone(), Some("case"), true);
        let mut counters = ProgressCounters::new();

        let outcome = engine.resolve(candidate(Some("case")), &mut counters).await.unwrap();

        let MergeOutcome::Update { id: updated_id, partial } = outcome else {
            panic!("expected update");
        };
        assert_eq!(updated_id, id);
        assert_eq!(partial["FILTER"].as_array().unwrap().len(), 2);
        assert_eq!(partial["FILTER"][1]["FILTER_label"], "case");
        assert_eq!(partial["QUAL"][1]["QUAL_score"], json!(50.0));
        assert_eq!(partial["DP"], json!([{"DP_label": "case", "DP_value": 14}]));
        assert_eq!(partial["sample"].as_array().unwrap().len(), 2);
        assert_eq!(partial["sample"][1]["sample_ID"], "S1");
        assert_eq!(partial["AN_case"], json!(2));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(counters.updated, 1);
        assert_eq!(counters.created, 0);
    }

    #[tokio::test]
    async fn test_update_falls_back_to_create() {
        let engine = engine(Arc::new(MockLookup::new()), Some("case"), true);
        let mut counters = ProgressCounters::new();

        let outcome = engine.resolve(candidate(Some("case")), &mut counters).await.unwrap();

        assert!(matches!(outcome, MergeOutcome::Create { .. }));
        assert_eq!(counters.created, 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_record_level() {
        let mut lookup = MockLookup::new();
        lookup.fail = true;
        let engine = engine(Arc::new(lookup), None, true);
        let mut counters = ProgressCounters::new();

        let err = engine.resolve(candidate(None), &mut counters).await.unwrap_err();

        assert!(err.is_record_level());
        assert_eq!(counters, ProgressCounters::default());
    }
}
