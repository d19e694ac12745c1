// src/reference.rs

use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

use crate::{model::ReferenceRow, process::utils::normalize_name, store::ReportStore};

/// Snapshot of the ramp and catch-area tables, keyed by normalized name.
/// Built once per run and never refreshed while the run is in flight.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMaps {
    ramps: HashMap<String, i64>,
    catch_areas: HashMap<String, i64>,
}

impl ReferenceMaps {
    pub fn from_rows(
        ramps: impl IntoIterator<Item = ReferenceRow>,
        catch_areas: impl IntoIterator<Item = ReferenceRow>,
    ) -> Self {
        Self {
            ramps: index_by_name("ramps", ramps),
            catch_areas: index_by_name("catcharea", catch_areas),
        }
    }

    pub fn ramp_id(&self, name: &str) -> Option<i64> {
        self.ramps.get(&normalize_name(name)).copied()
    }

    pub fn catch_area_id(&self, name: &str) -> Option<i64> {
        self.catch_areas.get(&normalize_name(name)).copied()
    }

    pub fn ramp_count(&self) -> usize {
        self.ramps.len()
    }

    pub fn catch_area_count(&self) -> usize {
        self.catch_areas.len()
    }
}

fn index_by_name(
    table: &str,
    rows: impl IntoIterator<Item = ReferenceRow>,
) -> HashMap<String, i64> {
    let mut map = HashMap::new();
    for row in rows {
        let key = normalize_name(&row.name);
        if let Some(previous) = map.insert(key, row.id) {
            warn!(
                table,
                name = %row.name,
                previous,
                id = row.id,
                "duplicate reference name after normalization; keeping the later id"
            );
        }
    }
    map
}

/// Read both reference tables (concurrently) and index them.
/// A failure on either side fails the whole load.
#[instrument(level = "info", skip(store))]
pub async fn load_reference_maps<S: ReportStore + ?Sized>(store: &S) -> Result<ReferenceMaps> {
    let (ramps, catch_areas) = tokio::try_join!(
        async { store.ramps().await.context("loading ramps") },
        async { store.catch_areas().await.context("loading catch areas") },
    )?;

    let maps = ReferenceMaps::from_rows(ramps, catch_areas);
    info!(
        ramps = maps.ramp_count(),
        catch_areas = maps.catch_area_count(),
        "loaded reference maps"
    );
    Ok(maps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn keys_are_normalized() {
        let maps = ReferenceMaps::from_rows(
            vec![ReferenceRow::new(3, " Sunset Point ")],
            vec![ReferenceRow::new(7, "AREA 10")],
        );
        assert_eq!(maps.ramp_id("sunset point"), Some(3));
        assert_eq!(maps.ramp_id("SUNSET POINT"), Some(3));
        assert_eq!(maps.catch_area_id(" area 10"), Some(7));
        assert_eq!(maps.catch_area_id("Area 11"), None);
        assert_eq!(maps.ramp_id(""), None);
    }

    #[test]
    fn later_duplicate_wins() {
        let maps = ReferenceMaps::from_rows(
            vec![
                ReferenceRow::new(1, "Edmonds"),
                ReferenceRow::new(2, "edmonds "),
            ],
            vec![],
        );
        assert_eq!(maps.ramp_count(), 1);
        assert_eq!(maps.ramp_id("Edmonds"), Some(2));
    }

    #[tokio::test]
    async fn loads_from_store() -> Result<()> {
        let store = MemoryStore::new()
            .with_ramp(3, "Sunset Point")
            .with_catch_area(7, "Area 10");
        let maps = load_reference_maps(&store).await?;
        assert_eq!(maps.ramp_id("Sunset Point"), Some(3));
        assert_eq!(maps.catch_area_id("Area 10"), Some(7));
        Ok(())
    }

    #[tokio::test]
    async fn read_failure_is_fatal() {
        let store = MemoryStore::new()
            .with_ramp(3, "Sunset Point")
            .fail_reference_reads();
        let err = load_reference_maps(&store).await.unwrap_err();
        assert!(format!("{:#}", err).contains("loading"));
    }
}
