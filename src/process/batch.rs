// src/process/batch.rs

use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    model::NormalizedReport,
    stats::RunStats,
    store::{ReportStore, UpsertOutcome},
};

/// Upsert every report of `batch`, in order. In dry-run mode nothing is written
/// and every report is counted as skipped instead. The first storage error
/// aborts; reports before it stay written.
pub async fn persist_batch<S: ReportStore + ?Sized>(
    store: &S,
    batch: &[NormalizedReport],
    dry_run: bool,
    stats: &mut RunStats,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }

    for report in batch {
        stats.processed += 1;
        if dry_run {
            stats.dry_run_skipped += 1;
            continue;
        }

        match store
            .upsert_report(report)
            .await
            .with_context(|| format!("persisting report {}", report.key()))?
        {
            UpsertOutcome::Inserted => stats.inserted += 1,
            UpsertOutcome::Updated => stats.updated += 1,
        }
    }
    stats.batches += 1;
    Ok(())
}

/// Holds normalized reports until `batch_size` are pending, then flushes them.
pub struct BatchPersister<'a, S: ?Sized> {
    store: &'a S,
    batch_size: usize,
    dry_run: bool,
    pending: Vec<NormalizedReport>,
}

impl<'a, S: ReportStore + ?Sized> BatchPersister<'a, S> {
    pub fn new(store: &'a S, batch_size: usize, dry_run: bool) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            batch_size,
            dry_run,
            pending: Vec::with_capacity(batch_size),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue one report, flushing when the batch is full.
    pub async fn push(&mut self, report: NormalizedReport, stats: &mut RunStats) -> Result<()> {
        self.pending.push(report);
        if self.pending.len() >= self.batch_size {
            self.flush(stats).await?;
        }
        Ok(())
    }

    /// Flush whatever is pending.
    pub async fn flush(&mut self, stats: &mut RunStats) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        persist_batch(self.store, &self.pending, self.dry_run, stats).await?;
        debug!(
            rows = self.pending.len(),
            batch = stats.batches,
            dry_run = self.dry_run,
            "flushed batch"
        );
        self.pending.clear();
        Ok(())
    }

    /// Call this once the source is exhausted, to flush any leftover reports.
    pub async fn finish(mut self, stats: &mut RunStats) -> Result<()> {
        self.flush(stats).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Catches, Species};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn report(day: u32, chinook: i32) -> NormalizedReport {
        let mut catches = Catches::default();
        catches.set(Species::Chinook, Some(chinook));
        NormalizedReport {
            sample_date: format!("Jan {}, 2024", day),
            sample_date_parsed: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            ramp_site: "Sunset Point".into(),
            catch_area: "Area 10".into(),
            interviews: None,
            anglers: None,
            chinook_per_angler: None,
            catches,
            ramp_id: 3,
            catch_area_id: 7,
        }
    }

    #[tokio::test]
    async fn persists_in_order_and_later_rows_win() -> Result<()> {
        let store = MemoryStore::new();
        let mut stats = RunStats::default();
        let batch = vec![report(1, 1), report(2, 2), report(1, 9)];
        persist_batch(&store, &batch, false, &mut stats).await?;

        assert_eq!(store.report_count(), 2);
        assert_eq!(
            store.report(&report(1, 0).key()).unwrap().catch(Species::Chinook),
            Some(9)
        );
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.batches, 1);
        Ok(())
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() -> Result<()> {
        let store = MemoryStore::new();
        let mut stats = RunStats::default();
        persist_batch(&store, &[report(1, 1), report(2, 2)], true, &mut stats).await?;
        assert_eq!(store.upsert_calls(), 0);
        assert_eq!(store.report_count(), 0);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.dry_run_skipped, 2);
        Ok(())
    }

    #[tokio::test]
    async fn storage_error_aborts_mid_batch() {
        let store = MemoryStore::new().fail_upserts_after(1);
        let mut stats = RunStats::default();
        let err = persist_batch(&store, &[report(1, 1), report(2, 2)], false, &mut stats)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("persisting report"));
        assert_eq!(store.report_count(), 1);
        assert_eq!(stats.inserted, 1);
    }

    #[tokio::test]
    async fn flushes_at_threshold_and_on_finish() -> Result<()> {
        let store = MemoryStore::new();
        let mut stats = RunStats::default();
        let mut persister = BatchPersister::new(&store, 2, false);

        persister.push(report(1, 1), &mut stats).await?;
        assert_eq!(store.report_count(), 0);
        persister.push(report(2, 1), &mut stats).await?;
        assert_eq!(store.report_count(), 2);
        assert_eq!(persister.pending(), 0);
        persister.push(report(3, 1), &mut stats).await?;
        assert_eq!(persister.pending(), 1);

        persister.finish(&mut stats).await?;
        assert_eq!(store.report_count(), 3);
        assert_eq!(stats.batches, 2);
        Ok(())
    }
}
