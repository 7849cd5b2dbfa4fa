//! OpenSearch index settings used around an import.
//!
//! Refreshing is switched off while batches are loaded and restored to a
//! normal cadence once the import finishes.

use serde_json::{json, Value};

/// Refresh interval that disables periodic refreshes.
pub const DISABLED_REFRESH_INTERVAL: &str = "-1";

/// Refresh interval restored after an import.
pub const DEFAULT_REFRESH_INTERVAL: &str = "30s";

/// Settings body that sets the refresh interval of an index.
pub fn refresh_settings(interval: &str) -> Value {
    json!({
        "index": {
            "refresh_interval": interval
        }
    })
}
