//! Annotation-family parsers.
//!
//! Each [`AnnotationParser`] tag selects one of the functions below. Nested
//! parsers turn one annotation value into a sequence of small records; scalar
//! parsers rewrite a keyword value.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use variant_indexer_shared::NestedRecord;

use crate::errors::TransformError;
use crate::processor::info::InfoAttributes;
use crate::schema::AnnotationParser;

static DISTANCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^dist=[a-zA-Z0-9]+;dist=[a-zA-Z0-9]+$").expect("valid distance regex")
});

/// Lists zipped by the clinvar parser, in output key order.
pub const CLINVAR_LISTS: [&str; 5] = ["CLINSIG", "CLNDBN", "CLNACC", "CLNDSDB", "CLNDSDBID"];

/// Input handed to a nested parser.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationInput<'a> {
    /// Value of the field being parsed.
    pub value: &'a str,
    /// Value of the field declared with `parse_with` for this one.
    pub companion: Option<&'a str>,
    /// The record's full INFO set.
    pub info: &'a InfoAttributes,
}

/// Key names of one gene annotation family.
#[derive(Debug, Clone, Copy)]
struct GeneFamily {
    prefix: &'static str,
    /// Gene symbol (refGene) or gene id (ensGene).
    group_key: &'static str,
    /// Record id key: refGene accession or ensGene transcript.
    accession_key: &'static str,
    accession_prefix: &'static str,
}

const REF_GENE: GeneFamily = GeneFamily {
    prefix: "refGene",
    group_key: "refGene_symbol",
    accession_key: "refGene_refgene_id",
    accession_prefix: "N",
};

const ENS_GENE: GeneFamily = GeneFamily {
    prefix: "ensGene",
    group_key: "ensGene_gene_id",
    accession_key: "ensGene_transcript_id",
    accession_prefix: "ENST",
};

impl GeneFamily {
    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }
}

impl AnnotationParser {
    /// Rewrite a keyword value. Nested parsers leave the value unchanged.
    pub fn parse_scalar(&self, value: &str) -> String {
        match self {
            Self::PipeJoin => pipe_join(value),
            Self::Chrom => normalize_chrom(value),
            _ => value.to_string(),
        }
    }

    /// Produce the nested records of one annotation value.
    pub fn parse_nested(&self, input: &AnnotationInput<'_>) -> Result<Vec<NestedRecord>, TransformError> {
        match self {
            Self::RefGeneDetail => Ok(gene_detail(&REF_GENE, input.value, input.companion)),
            Self::EnsGeneDetail => Ok(gene_detail(&ENS_GENE, input.value, input.companion)),
            Self::AaChangeRefGene => aa_change(&REF_GENE, input.value),
            Self::AaChangeEnsGene => aa_change(&ENS_GENE, input.value),
            Self::Clinvar => clinvar(input.info),
            Self::PipeJoin | Self::Chrom => Ok(Vec::new()),
        }
    }
}

/// Gene detail records.
///
/// `genes` is the gene field (`;`/`,`-joined symbols, re-joined with spaces)
/// and `detail` the GeneDetail companion. A `dist=X;dist=Y` detail yields one
/// distance record; a colon/comma transcript list yields one record per
/// transcript; no detail yields one record carrying only the gene.
fn gene_detail(family: &GeneFamily, genes: &str, detail: Option<&str>) -> Vec<NestedRecord> {
    let symbol = genes
        .split([';', ','])
        .collect::<Vec<_>>()
        .join(" ");

    let Some(detail) = detail.filter(|d| !d.is_empty()) else {
        let mut record = NestedRecord::new();
        record.insert(family.group_key.to_string(), Value::String(symbol));
        return vec![record];
    };

    if DISTANCE_PATTERN.is_match(detail) {
        let mut record = NestedRecord::new();
        record.insert(family.group_key.to_string(), Value::String(symbol));
        record.insert(family.key("distance_to_gene"), Value::String(detail.to_string()));
        return vec![record];
    }

    if !detail.contains(':') {
        return Vec::new();
    }

    detail
        .split(',')
        .map(|transcript| {
            let mut record = NestedRecord::new();
            for token in transcript.split(':') {
                if token.starts_with(family.accession_prefix) {
                    record.insert(family.accession_key.to_string(), Value::String(token.to_string()));
                } else if token.starts_with("exon") {
                    record.insert(family.key("location"), Value::String(token.to_string()));
                } else if token.starts_with("c.") {
                    record.insert(family.key("cDNA_change"), Value::String(token.to_string()));
                }
            }
            record.insert(family.group_key.to_string(), Value::String(symbol.clone()));
            record
        })
        .collect()
}

/// AAChange records: `GENE:ACCESSION:LOCATION[:cDNA[:AA]]` entries, comma
/// separated. Empty and `unknown` entries are skipped.
fn aa_change(family: &GeneFamily, value: &str) -> Result<Vec<NestedRecord>, TransformError> {
    let mut records = Vec::new();

    for entry in value.split(',') {
        if entry.is_empty() || entry.eq_ignore_ascii_case("unknown") {
            continue;
        }

        let fields: Vec<&str> = entry.split(':').collect();
        if !(3..=5).contains(&fields.len()) {
            return Err(TransformError::AaChangeFieldCount {
                entry: entry.to_string(),
                count: fields.len(),
            });
        }

        let keys = [
            family.group_key.to_string(),
            family.accession_key.to_string(),
            family.key("location"),
            family.key("cDNA_change"),
            family.key("aa_change"),
        ];
        let record: NestedRecord = keys
            .into_iter()
            .zip(fields)
            .map(|(key, field)| (key, Value::String(field.to_string())))
            .collect();
        records.push(record);
    }

    Ok(records)
}

/// Zip the five pipe-delimited clinvar lists into one record per disease.
fn clinvar(info: &InfoAttributes) -> Result<Vec<NestedRecord>, TransformError> {
    let mut lists: Vec<(&str, Vec<&str>)> = Vec::with_capacity(CLINVAR_LISTS.len());
    for name in CLINVAR_LISTS {
        let value = info
            .text(name)
            .ok_or_else(|| TransformError::ClinvarMissingList(name.to_string()))?;
        lists.push((name, value.split('|').collect()));
    }

    let expected = lists
        .iter()
        .find(|(name, _)| *name == "CLNDBN")
        .map(|(_, entries)| entries.len())
        .unwrap_or_default();
    if let Some((name, entries)) = lists.iter().find(|(_, entries)| entries.len() != expected) {
        return Err(TransformError::ClinvarLengthMismatch {
            list: name.to_string(),
            expected,
            found: entries.len(),
        });
    }

    Ok((0..expected)
        .map(|idx| {
            lists
                .iter()
                .map(|(name, entries)| {
                    (format!("clinvar_{}", name), Value::String(entries[idx].to_string()))
                })
                .collect()
        })
        .collect())
}

/// Replace `|` separators with spaces.
pub fn pipe_join(value: &str) -> String {
    value.replace('|', " ")
}

/// Lower-case a chromosome name and strip its `chr` prefix.
pub fn normalize_chrom(value: &str) -> String {
    value.to_lowercase().replace("chr", "").trim().to_string()
}

/// Drop bare duplicates from a gene-family group.
///
/// A record whose `key` value occurs once is kept. When the value repeats,
/// only records with more than one attribute are kept.
pub fn prune(key: &str, records: Vec<Value>) -> Vec<Value> {
    let group_of = |record: &Value| record.get(key).map(Value::to_string);

    let mut counts: HashMap<Option<String>, usize> = HashMap::new();
    for record in &records {
        *counts.entry(group_of(record)).or_default() += 1;
    }

    records
        .into_iter()
        .filter(|record| {
            let attributes = record.as_object().map(|o| o.len()).unwrap_or_default();
            counts.get(&group_of(record)).copied().unwrap_or_default() == 1 || attributes > 1
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn records(values: Vec<NestedRecord>) -> Value {
        Value::Array(values.into_iter().map(Value::Object).collect())
    }

    fn parse(parser: AnnotationParser, value: &str, companion: Option<&str>) -> Result<Value, TransformError> {
        let info = InfoAttributes::default();
        let input = AnnotationInput {
            value,
            companion,
            info: &info,
        };
        parser.parse_nested(&input).map(records)
    }

    #[test]
    fn test_aa_change_four_fields() {
        let parsed = parse(
            AnnotationParser::AaChangeRefGene,
            "DDX11L1:NR_046018:exon1:c.1A>G",
            None,
        )
        .unwrap();

        assert_eq!(
            parsed,
            json!([{
                "refGene_symbol": "DDX11L1",
                "refGene_refgene_id": "NR_046018",
                "refGene_location": "exon1",
                "refGene_cDNA_change": "c.1A>G"
            }])
        );
        assert!(parsed[0].get("refGene_aa_change").is_none());
    }

    #[test]
    fn test_aa_change_five_fields() {
        let parsed = parse(
            AnnotationParser::AaChangeEnsGene,
            "ENSG0001:ENST0001:exon2:c.5C>T:p.P2L,unknown,",
            None,
        )
        .unwrap();

        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["ensGene_gene_id"], "ENSG0001");
        assert_eq!(parsed[0]["ensGene_transcript_id"], "ENST0001");
        assert_eq!(parsed[0]["ensGene_aa_change"], "p.P2L");
    }

    #[test]
    fn test_aa_change_bad_field_count() {
        let err = parse(AnnotationParser::AaChangeRefGene, "DDX11L1:NR_046018", None).unwrap_err();
        assert_eq!(
            err,
            TransformError::AaChangeFieldCount {
                entry: "DDX11L1:NR_046018".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn test_aa_change_unknown_and_empty_skipped() {
        assert_eq!(parse(AnnotationParser::AaChangeRefGene, "UNKNOWN", None).unwrap(), json!([]));
        assert_eq!(parse(AnnotationParser::AaChangeRefGene, "", None).unwrap(), json!([]));
    }

    #[test]
    fn test_gene_detail_distance() {
        let parsed = parse(
            AnnotationParser::RefGeneDetail,
            "GENEA,GENEB",
            Some("dist=1234;dist=5678"),
        )
        .unwrap();

        assert_eq!(
            parsed,
            json!([{
                "refGene_symbol": "GENEA GENEB",
                "refGene_distance_to_gene": "dist=1234;dist=5678"
            }])
        );
    }

    #[test]
    fn test_gene_detail_transcripts() {
        let parsed = parse(
            AnnotationParser::RefGeneDetail,
            "SAMD11",
            Some("NM_152486:exon2:c.100-5A>G,NR_024540:exon3:c.200+1G>T"),
        )
        .unwrap();

        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["refGene_refgene_id"], "NM_152486");
        assert_eq!(parsed[0]["refGene_location"], "exon2");
        assert_eq!(parsed[0]["refGene_cDNA_change"], "c.100-5A>G");
        assert_eq!(parsed[1]["refGene_symbol"], "SAMD11");
    }

    #[test]
    fn test_ens_gene_detail_without_detail() {
        let parsed = parse(AnnotationParser::EnsGeneDetail, "ENSG01;ENSG02", None).unwrap();
        assert_eq!(parsed, json!([{"ensGene_gene_id": "ENSG01 ENSG02"}]));
    }

    #[test]
    fn test_clinvar_zip() {
        let info = InfoAttributes::parse(
            "CLINSIG=pathogenic|benign;CLNDBN=DiseaseA|DiseaseB;CLNACC=RCV1|RCV2;\
             CLNDSDB=MedGen|OMIM;CLNDSDBID=C1|C2",
            &HashSet::new(),
        );
        let input = AnnotationInput {
            value: "DiseaseA|DiseaseB",
            companion: None,
            info: &info,
        };

        let parsed = records(AnnotationParser::Clinvar.parse_nested(&input).unwrap());

        assert_eq!(
            parsed[1],
            json!({
                "clinvar_CLINSIG": "benign",
                "clinvar_CLNDBN": "DiseaseB",
                "clinvar_CLNACC": "RCV2",
                "clinvar_CLNDSDB": "OMIM",
                "clinvar_CLNDSDBID": "C2"
            })
        );
    }

    #[test]
    fn test_clinvar_length_mismatch() {
        let info = InfoAttributes::parse(
            "CLINSIG=pathogenic;CLNDBN=DiseaseA|DiseaseB;CLNACC=RCV1|RCV2;\
             CLNDSDB=MedGen|OMIM;CLNDSDBID=C1|C2",
            &HashSet::new(),
        );
        let input = AnnotationInput {
            value: "DiseaseA|DiseaseB",
            companion: None,
            info: &info,
        };

        let err = AnnotationParser::Clinvar.parse_nested(&input).unwrap_err();
        assert_eq!(
            err,
            TransformError::ClinvarLengthMismatch {
                list: "CLINSIG".to_string(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_scalar_parsers() {
        assert_eq!(
            AnnotationParser::PipeJoin.parse_scalar("Brain|Liver|Lung"),
            "Brain Liver Lung"
        );
        assert_eq!(AnnotationParser::Chrom.parse_scalar(" Chr7 "), "7");
    }

    #[test]
    fn test_prune_drops_bare_duplicate() {
        let pruned = prune(
            "refGene_symbol",
            vec![
                json!({"refGene_symbol": "X"}),
                json!({"refGene_symbol": "X", "extra": "Y"}),
            ],
        );

        assert_eq!(pruned, vec![json!({"refGene_symbol": "X", "extra": "Y"})]);
    }

    #[test]
    fn test_prune_keeps_unique_keys() {
        let pruned = prune(
            "refGene_symbol",
            vec![json!({"refGene_symbol": "X"}), json!({"refGene_symbol": "Z"})],
        );
        assert_eq!(pruned.len(), 2);
    }
}
