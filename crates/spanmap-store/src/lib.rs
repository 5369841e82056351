//! Persistence for the spanmap service graph.
//!
//! Counters are only ever changed through blind delta upserts
//! (`total = total + delta`), so concurrent writers for the same service
//! commute and never lose increments.

mod legacy;
mod store;

pub use legacy::{parse_legacy_export, LegacyExport, LegacyServiceDocument};
pub use store::{ImportSummary, ServiceMapStore, StoreError};

use std::time::{SystemTime, UNIX_EPOCH};

/// A change applied to one counter triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterDelta {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
}

impl CounterDelta {
    /// One request, counted as failed when `is_error` is set.
    pub fn single(is_error: bool) -> Self {
        if is_error {
            Self { total: 1, successful: 0, failed: 1 }
        } else {
            Self { total: 1, successful: 1, failed: 0 }
        }
    }

    /// Builds a delta from split counts; `total` is always their sum.
    pub fn from_counts(successful: u64, failed: u64) -> Self {
        Self { total: successful + failed, successful, failed }
    }
}

/// Current time as Unix milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
