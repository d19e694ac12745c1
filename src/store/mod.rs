// src/store/mod.rs

mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{NaturalKey, NormalizedReport, ReferenceRow};

pub use self::memory::MemoryStore;

/// What an upsert did to the report table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// The reporting store as seen by the ingest pipeline.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// All rows of the ramps table.
    async fn ramps(&self) -> Result<Vec<ReferenceRow>>;

    /// All rows of the catch-area table.
    async fn catch_areas(&self) -> Result<Vec<ReferenceRow>>;

    /// Insert `report`, or overwrite every non-key field of the report with the
    /// same natural key.
    async fn upsert_report(&self, report: &NormalizedReport) -> Result<UpsertOutcome>;

    /// Whether a report with this natural key is stored. Diagnostic only;
    /// ingest relies on `upsert_report` to pick insert or update.
    async fn report_exists(&self, key: &NaturalKey) -> Result<bool>;

    /// Release the underlying connection. Called once, after the run.
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}
