//! Variant Indexer
//!
//! Entry point for importing one annotated VCF into the search backend.

use std::env;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use variant_indexer::{Dependencies, ImportSettings, IndexingError};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run() -> Result<(), IndexingError> {
    let settings = ImportSettings::from_env()?;
    let dependencies = Dependencies::new(settings).await?;
    let (summary, stats) = dependencies.run().await?;

    info!(
        processed = summary.counters.processed,
        created = summary.counters.created,
        updated = summary.counters.updated,
        skipped = summary.skipped,
        batches = summary.batches,
        batches_failed = stats.batches_failed,
        elapsed_secs = summary.elapsed().num_seconds(),
        "Import finished"
    );

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Import failed");
            ExitCode::FAILURE
        }
    }
}
