//! Loader module for the variant indexer pipeline.
//!
//! Serializes merge outcomes as bulk action pairs, writes them into
//! size-bounded batch files and hands each closed batch to a dispatcher that
//! posts it to the search backend in the background.

mod bulk;
mod dispatcher;
mod emitter;

pub use bulk::BulkAction;
pub use dispatcher::{
    BatchDispatcher, DispatchStats, DispatchWorker, DispatcherConfig, TaskQueueDispatcher,
};
pub use emitter::{batch_file_name, BatchEmitter, DEFAULT_BATCH_THRESHOLD_BYTES};
