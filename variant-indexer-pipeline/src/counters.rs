//! Progress counters of one import run.

/// Totals of documents produced by a run.
///
/// Owned by the orchestrator and passed by reference into the merge engine;
/// every produced document bumps `processed` and exactly one of `created` or
/// `updated`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounters {
    pub processed: u64,
    pub created: u64,
    pub updated: u64,
}

impl ProgressCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&mut self) {
        self.processed += 1;
        self.created += 1;
    }

    pub fn record_updated(&mut self) {
        self.processed += 1;
        self.updated += 1;
    }
}
