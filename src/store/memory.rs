//! In-memory report store for tests and local development.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use super::{ReportStore, UpsertOutcome};
use crate::model::{NaturalKey, NormalizedReport, ReferenceRow};

#[derive(Debug, Default)]
struct State {
    ramps: Vec<ReferenceRow>,
    catch_areas: Vec<ReferenceRow>,
    reports: BTreeMap<NaturalKey, NormalizedReport>,
    upsert_calls: usize,
    fail_reference_reads: bool,
    fail_upserts_after: Option<usize>,
    fail_close: bool,
    closed: bool,
}

/// Clones share state, so a test can keep a handle after moving one into a pipeline.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ramp(self, id: i64, name: &str) -> Self {
        self.lock().ramps.push(ReferenceRow::new(id, name));
        self
    }

    pub fn with_catch_area(self, id: i64, name: &str) -> Self {
        self.lock().catch_areas.push(ReferenceRow::new(id, name));
        self
    }

    /// Make `ramps`/`catch_areas` fail.
    pub fn fail_reference_reads(self) -> Self {
        self.lock().fail_reference_reads = true;
        self
    }

    /// Let `n` upserts succeed, then fail every following one.
    pub fn fail_upserts_after(self, n: usize) -> Self {
        self.lock().fail_upserts_after = Some(n);
        self
    }

    /// Make `close` fail (the store still counts as closed).
    pub fn fail_close(self) -> Self {
        self.lock().fail_close = true;
        self
    }

    /// Whether `close` has been called on any clone.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn report_count(&self) -> usize {
        self.lock().reports.len()
    }

    pub fn upsert_calls(&self) -> usize {
        self.lock().upsert_calls
    }

    pub fn report(&self, key: &NaturalKey) -> Option<NormalizedReport> {
        self.lock().reports.get(key).cloned()
    }

    /// All stored reports in natural-key order.
    pub fn reports(&self) -> Vec<NormalizedReport> {
        self.lock().reports.values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // recover from poisoning
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn ramps(&self) -> Result<Vec<ReferenceRow>> {
        let state = self.lock();
        if state.fail_reference_reads {
            bail!("ramps table unavailable");
        }
        Ok(state.ramps.clone())
    }

    async fn catch_areas(&self) -> Result<Vec<ReferenceRow>> {
        let state = self.lock();
        if state.fail_reference_reads {
            bail!("catcharea table unavailable");
        }
        Ok(state.catch_areas.clone())
    }

    async fn upsert_report(&self, report: &NormalizedReport) -> Result<UpsertOutcome> {
        let mut state = self.lock();
        if let Some(limit) = state.fail_upserts_after {
            if state.upsert_calls >= limit {
                bail!("upsert rejected for {}", report.key());
            }
        }
        state.upsert_calls += 1;
        match state.reports.insert(report.key(), report.clone()) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Inserted),
        }
    }

    async fn report_exists(&self, key: &NaturalKey) -> Result<bool> {
        Ok(self.lock().reports.contains_key(key))
    }

    fn close(self) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            bail!("memory store closed twice");
        }
        state.closed = true;
        if state.fail_close {
            bail!("memory store close failed");
        }
        Ok(())
    }
}
