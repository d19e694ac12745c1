// src/pipeline.rs

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::{
    config::Config,
    fetch::{self, Source},
    process::{
        batch::BatchPersister,
        csv_stream::{ByteStream, CsvRowStream},
        normalize::normalize_row,
    },
    reference::{load_reference_maps, ReferenceMaps},
    stats::RunStats,
    store::ReportStore,
};

/// The one auditable result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub message: String,
    pub stats: RunStats,
    pub source: String,
    pub dry_run: bool,
    pub batch_size: usize,
}

/// Ingest pipeline. Owns the report store for its whole life; the store is
/// released by [`Pipeline::run_once`] or when the pipeline is dropped.
pub struct Pipeline<S> {
    store: S,
    client: Client,
    config: Config,
}

impl<S: ReportStore> Pipeline<S> {
    pub fn new(store: S, client: Client, config: Config) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn into_store(self) -> S {
        self.store
    }

    /// Run once, then close the store whatever the outcome. A run error is
    /// reported in preference to a close error.
    pub async fn run_once(self) -> Result<RunSummary> {
        let outcome = self.run().await;
        let closed = self.store.close();
        match (outcome, closed) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(run_err), Ok(())) => Err(run_err),
            (Err(run_err), Err(close_err)) => {
                error!(error = ?close_err, "closing report store after failed run");
                Err(run_err)
            }
        }
    }

    /// Fetch the export and upsert every valid row.
    #[instrument(level = "info", skip(self), fields(dry_run = self.config.dry_run, batch_size = self.config.batch_size))]
    pub async fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();
        let source = Source::from_config(&self.config)?;
        let refs = load_reference_maps(&self.store)
            .await
            .context("loading reference data")?;
        let bytes = fetch::open_source(&self.client, &source)
            .await
            .with_context(|| format!("opening source {}", source))?;

        let stats = self.ingest(bytes, &refs).await?;

        let summary = RunSummary {
            message: "ingest complete".to_string(),
            stats,
            source: source.to_string(),
            dry_run: self.config.dry_run,
            batch_size: self.config.batch_size,
        };
        info!(
            seen = stats.seen,
            processed = stats.processed,
            skipped_invalid = stats.skipped_invalid,
            dry_run_skipped = stats.dry_run_skipped,
            inserted = stats.inserted,
            updated = stats.updated,
            source = %summary.source,
            elapsed = ?start.elapsed(),
            "ingest complete"
        );
        Ok(summary)
    }

    /// Parse, normalize and persist one byte stream against a fixed reference snapshot.
    pub async fn ingest(&self, bytes: ByteStream, refs: &ReferenceMaps) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let mut rows = CsvRowStream::new(bytes);
        let mut persister =
            BatchPersister::new(&self.store, self.config.batch_size, self.config.dry_run);

        while let Some(row) = rows
            .next_row()
            .await
            .with_context(|| format!("reading CSV after {} rows", stats.seen))?
        {
            stats.seen += 1;
            match normalize_row(&row, refs) {
                Ok(report) => persister.push(report, &mut stats).await?,
                Err(rejection) => {
                    debug!(row = stats.seen, %rejection, "skipping row");
                    stats.record_rejection(&rejection);
                }
            }
        }
        persister.finish(&mut stats).await?;
        Ok(stats)
    }
}
