//! Import settings read from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use variant_indexer_pipeline::loader::DEFAULT_BATCH_THRESHOLD_BYTES;
use variant_indexer_pipeline::merge::{RunContext, NO_LABEL};
use variant_indexer_pipeline::orchestrator::OrchestratorConfig;
use variant_indexer_pipeline::reader::DEFAULT_ESTIMATE_LINES;
use variant_indexer_repository::opensearch::DEFAULT_REFRESH_INTERVAL;

use crate::IndexingError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default document type.
const DEFAULT_DOC_TYPE: &str = "_doc";

/// Default wait before the refresh interval is restored.
const DEFAULT_GRACE_SECS: u64 = 60;

/// Everything one import run needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    pub opensearch_url: String,
    pub index: String,
    pub doc_type: String,
    pub vcf_path: PathBuf,
    pub mapping_path: PathBuf,
    pub label: Option<String>,
    pub update: bool,
    pub batch_threshold_bytes: u64,
    pub estimate_sample_lines: usize,
    pub max_records: Option<usize>,
    pub grace_period: Duration,
    pub refresh_interval: String,
}

impl ImportSettings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: backend URL (default: http://localhost:9200)
    /// - `VCF_INDEX`: target index (required)
    /// - `VCF_DOC_TYPE`: document type (default: _doc)
    /// - `VCF_FILE`: VCF file to import (required)
    /// - `VCF_MAPPING`: mapping description JSON (required)
    /// - `VCF_LABEL`: cohort label, `None` for unlabelled (default: None)
    /// - `VCF_UPDATE`: merge into existing documents (default: false)
    /// - `VCF_BATCH_BYTES`: batch rotation threshold (default: 83886080)
    /// - `VCF_ESTIMATE_LINES`: lines sampled by the estimator (default: 200000)
    /// - `VCF_MAX_RECORDS`: hard limit on records read (default: unset)
    /// - `VCF_GRACE_SECS`: wait before restoring refresh (default: 60)
    /// - `VCF_REFRESH_INTERVAL`: refresh interval restored at the end (default: 30s)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| IndexingError::config(format!("{} must be set", key)))
        };

        let label = lookup("VCF_LABEL").unwrap_or_else(|| NO_LABEL.to_string());
        let grace_secs: u64 = parse_or(&lookup, "VCF_GRACE_SECS", DEFAULT_GRACE_SECS)?;
        let max_records = match lookup("VCF_MAX_RECORDS") {
            Some(raw) => Some(parse("VCF_MAX_RECORDS", &raw)?),
            None => None,
        };

        Ok(Self {
            opensearch_url: lookup("OPENSEARCH_URL")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            index: required("VCF_INDEX")?,
            doc_type: lookup("VCF_DOC_TYPE").unwrap_or_else(|| DEFAULT_DOC_TYPE.to_string()),
            vcf_path: PathBuf::from(required("VCF_FILE")?),
            mapping_path: PathBuf::from(required("VCF_MAPPING")?),
            label: RunContext::parse_label(&label),
            update: parse_flag(&lookup, "VCF_UPDATE")?,
            batch_threshold_bytes: parse_or(&lookup, "VCF_BATCH_BYTES", DEFAULT_BATCH_THRESHOLD_BYTES)?,
            estimate_sample_lines: parse_or(&lookup, "VCF_ESTIMATE_LINES", DEFAULT_ESTIMATE_LINES)?,
            max_records,
            grace_period: Duration::from_secs(grace_secs),
            refresh_interval: lookup("VCF_REFRESH_INTERVAL")
                .unwrap_or_else(|| DEFAULT_REFRESH_INTERVAL.to_string()),
        })
    }

    pub fn run_context(&self) -> RunContext {
        RunContext::new(
            self.index.clone(),
            self.doc_type.clone(),
            self.label.clone(),
            self.update,
        )
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            estimate_sample_lines: self.estimate_sample_lines,
            max_records: self.max_records,
            batch_threshold_bytes: self.batch_threshold_bytes,
            grace_period: self.grace_period,
            refresh_interval: self.refresh_interval.clone(),
        }
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, IndexingError> {
    raw.trim()
        .parse()
        .map_err(|_| IndexingError::config(format!("{} has an invalid value: {}", key, raw)))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, IndexingError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, key: &str) -> Result<bool, IndexingError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(IndexingError::config(format!("{} has an invalid value: {}", key, raw))),
        },
    }
}
