//! Per-sample genotype extraction.

use variant_indexer_shared::SampleGenotype;

use crate::errors::TransformError;
use crate::processor::coerce::coerce;
use crate::reader::RawVariantRecord;
use crate::schema::SchemaRegistry;

/// Genotypes that are not recorded: missing and homozygous reference.
pub const SKIPPED_GENOTYPES: [&str; 3] = ["./.", "0/0", "0|0"];

/// Decode the FORMAT values of every non-reference sample of a record.
///
/// Values are typed by the registry's FORMAT datatypes; `.` values are left
/// out. Samples shorter than FORMAT lack the trailing keys.
pub fn extract_samples(
    record: &RawVariantRecord,
    schema: &SchemaRegistry,
    label: Option<&str>,
) -> Result<Vec<SampleGenotype>, TransformError> {
    let Some(format) = record.format() else {
        return Ok(Vec::new());
    };
    if record.header().samples().is_empty() {
        return Ok(Vec::new());
    }

    let keys: Vec<&str> = format.split(':').collect();
    let gt_index = keys
        .iter()
        .position(|key| *key == "GT")
        .ok_or_else(|| TransformError::MissingGenotype(format.to_string()))?;

    let mut genotypes = Vec::new();
    for (sample_id, raw) in record.samples() {
        let values: Vec<&str> = raw.split(':').collect();
        let genotype = values.get(gt_index).copied().unwrap_or(".");
        if SKIPPED_GENOTYPES.contains(&genotype) {
            continue;
        }

        let mut sample = SampleGenotype::new(sample_id, label.map(str::to_string));
        for (key, value) in keys.iter().zip(values) {
            if let Some(decoded) = coerce(key, value, schema.format_datatype(key))? {
                sample.insert(key, decoded);
            }
        }
        genotypes.push(sample);
    }

    Ok(genotypes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::VcfHeader;
    use serde_json::json;
    use std::sync::Arc;

    fn schema() -> SchemaRegistry {
        SchemaRegistry::from_value(json!({
            "FORMAT_FIELDS": {
                "nested_fields": {
                    "GT": {"es_field_datatype": "keyword"},
                    "DP": {"es_field_datatype": "integer"},
                    "AD": {"es_field_datatype": "integer"},
                    "GQ": {"es_field_datatype": "float"}
                }
            }
        }))
        .unwrap()
    }

    fn record(format: &str, samples: &[&str]) -> RawVariantRecord {
        let mut header = String::from("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT");
        let mut line = format!("1\t100\t.\tA\tT\t50\tPASS\t.\t{}", format);
        for (idx, sample) in samples.iter().enumerate() {
            header.push_str(&format!("\tS{}", idx + 1));
            line.push('\t');
            line.push_str(sample);
        }
        let header = Arc::new(VcfHeader::parse(&header).unwrap());
        RawVariantRecord::parse(header, &line, 2).unwrap()
    }

    #[test]
    fn test_homozygous_reference_skipped() {
        let samples = extract_samples(&record("GT:DP", &["0/0:30", "0/1:30"]), &schema(), None).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].sample_id, "S2");
        assert_eq!(samples[0].get("DP"), Some(&json!(30)));
        assert_eq!(samples[0].get("GT"), Some(&json!("0/1")));
    }

    #[test]
    fn test_missing_and_phased_reference_skipped() {
        let samples = extract_samples(&record("GT", &["./.", "0|0"]), &schema(), None).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_typed_values_and_label() {
        let samples = extract_samples(
            &record("GT:AD:GQ:PL", &["1/1:3,7:nan:0,30,300"]),
            &schema(),
            Some("case"),
        )
        .unwrap();

        let sample = &samples[0];
        assert_eq!(sample.get("AD"), Some(&json!([3, 7])));
        assert!(sample.get("GQ").is_none());
        assert_eq!(sample.get("PL"), Some(&json!("0,30,300")));
        assert_eq!(sample.label.as_deref(), Some("case"));
    }

    #[test]
    fn test_trailing_values_may_be_dropped() {
        let samples = extract_samples(&record("GT:DP:GQ", &["0/1"]), &schema(), None).unwrap();
        assert_eq!(samples[0].values.len(), 1);
    }

    #[test]
    fn test_format_without_gt() {
        let err = extract_samples(&record("DP", &["30"]), &schema(), None).unwrap_err();
        assert_eq!(err, TransformError::MissingGenotype("DP".to_string()));
    }
}
