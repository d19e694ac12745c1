// src/stats.rs

use serde::Serialize;

use crate::process::normalize::Rejection;

/// Dropped rows broken down by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionCounts {
    pub bad_date: u64,
    pub unknown_ramp: u64,
    pub unknown_catch_area: u64,
}

/// Counters for one ingest run. Only ever incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    /// Data rows read from the source.
    pub seen: u64,
    /// Rows that normalized and reached the persister (dry-run included).
    pub processed: u64,
    pub skipped_invalid: u64,
    pub dry_run_skipped: u64,
    pub inserted: u64,
    pub updated: u64,
    /// Flushes that carried at least one row.
    pub batches: u64,
    pub rejections: RejectionCounts,
}

impl RunStats {
    pub fn record_rejection(&mut self, rejection: &Rejection) {
        self.skipped_invalid += 1;
        match rejection {
            Rejection::BadDate(_) => self.rejections.bad_date += 1,
            Rejection::UnknownRamp(_) => self.rejections.unknown_ramp += 1,
            Rejection::UnknownCatchArea(_) => self.rejections.unknown_catch_area += 1,
        }
    }
}
