// src/duck/mod.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use duckdb::{params, Connection, ToSql};
use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};
use tracing::{debug, info};

use crate::{
    model::{Catches, NaturalKey, NormalizedReport, ReferenceRow, Species},
    store::{ReportStore, UpsertOutcome},
};

const REFERENCE_DDL: &str = "
CREATE TABLE IF NOT EXISTS ramps (
    id BIGINT PRIMARY KEY,
    name VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS catcharea (
    id BIGINT PRIMARY KEY,
    name VARCHAR NOT NULL
);";

/// Report columns ahead of the per-species counts.
const LEADING_COLUMNS: [&str; 7] = [
    "sample_date",
    "sample_date_parsed",
    "ramp_site",
    "catch_area",
    "interviews",
    "anglers",
    "chinook_per_angler",
];

const KEY_COLUMNS: [&str; 3] = ["sample_date_parsed", "ramp_id", "catch_area_id"];

fn report_ddl() -> String {
    let species: String = Species::ALL
        .iter()
        .map(|sp| format!("    {} INTEGER,\n", sp.column()))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS report (
    sample_date VARCHAR NOT NULL,
    sample_date_parsed DATE NOT NULL,
    ramp_site VARCHAR NOT NULL,
    catch_area VARCHAR NOT NULL,
    interviews INTEGER,
    anglers INTEGER,
    chinook_per_angler DOUBLE,
{species}    ramp_id BIGINT NOT NULL,
    catch_area_id BIGINT NOT NULL,
    PRIMARY KEY ({key})
);",
        species = species,
        key = KEY_COLUMNS.join(", ")
    )
}

/// All report columns in the order used for inserts and selects.
fn report_columns() -> Vec<&'static str> {
    LEADING_COLUMNS
        .into_iter()
        .chain(Species::ALL.into_iter().map(Species::column))
        .chain(["ramp_id", "catch_area_id"])
        .collect()
}

fn upsert_sql() -> String {
    let columns = report_columns();
    let placeholders: Vec<&str> = columns
        .iter()
        .map(|c| {
            if *c == "sample_date_parsed" {
                "CAST(? AS DATE)"
            } else {
                "?"
            }
        })
        .collect();
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !KEY_COLUMNS.contains(*c))
        .map(|c| format!("{c} = excluded.{c}"))
        .collect();
    format!(
        "INSERT INTO report ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
        columns.join(", "),
        placeholders.join(", "),
        KEY_COLUMNS.join(", "),
        updates.join(", ")
    )
}

fn select_report_sql() -> String {
    let columns: Vec<String> = report_columns()
        .into_iter()
        .map(|c| {
            if c == "sample_date_parsed" {
                "CAST(sample_date_parsed AS VARCHAR)".to_string()
            } else {
                c.to_string()
            }
        })
        .collect();
    format!(
        "SELECT {} FROM report WHERE sample_date_parsed = CAST(? AS DATE) AND ramp_id = ? AND catch_area_id = ?",
        columns.join(", ")
    )
}

fn iso_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// DuckDB-backed reporting store: `ramps`, `catcharea` and `report` tables.
pub struct DuckStore {
    conn: Mutex<Connection>,
    upsert_sql: String,
    select_sql: String,
}

impl DuckStore {
    /// Open a DuckDB database on disk at `path`, creating the file and the
    /// tables if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("opening duckdb at {}", path.display()))?;
        info!(path = %path.display(), "opened report store");
        Self::from_connection(conn)
    }

    /// Open a DuckDB in‐memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory duckdb")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            upsert_sql: upsert_sql(),
            select_sql: select_report_sql(),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("duckdb connection mutex poisoned"))
    }

    /// Create the reference and report tables if missing.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(REFERENCE_DDL)
            .context("creating reference tables")?;
        conn.execute_batch(&report_ddl())
            .context("creating report table")?;
        Ok(())
    }

    /// Insert or rename a ramp.
    pub fn put_ramp(&self, id: i64, name: &str) -> Result<()> {
        self.put_reference("ramps", id, name)
    }

    /// Insert or rename a catch area.
    pub fn put_catch_area(&self, id: i64, name: &str) -> Result<()> {
        self.put_reference("catcharea", id, name)
    }

    fn put_reference(&self, table: &str, id: i64, name: &str) -> Result<()> {
        let sql = format!(
            "INSERT INTO {table} (id, name) VALUES (?, ?) ON CONFLICT (id) DO UPDATE SET name = excluded.name"
        );
        self.conn()?
            .execute(&sql, params![id, name])
            .with_context(|| format!("writing {} row {}", table, id))?;
        Ok(())
    }

    fn list_reference(&self, table: &str) -> Result<Vec<ReferenceRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT id, name FROM {table} ORDER BY id"))
            .with_context(|| format!("preparing select on {}", table))?;
        let rows = stmt
            .query_map([], |r| {
                Ok(ReferenceRow {
                    id: r.get(0)?,
                    name: r.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("reading {}", table))?;
        Ok(rows)
    }

    pub fn report_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM report", [], |r| r.get(0))
            .context("counting reports")?;
        Ok(count as u64)
    }

    /// Read back one report by its natural key.
    pub fn get_report(&self, key: &NaturalKey) -> Result<Option<NormalizedReport>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&self.select_sql)?;
        let date = iso_date(key.sample_date);
        let mut rows = stmt.query(params![date, key.ramp_id, key.catch_area_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let parsed: String = row.get(1)?;
        let mut catches = Catches::default();
        for (i, sp) in Species::ALL.into_iter().enumerate() {
            catches.set(sp, row.get(LEADING_COLUMNS.len() + i)?);
        }
        let tail = LEADING_COLUMNS.len() + Species::COUNT;
        Ok(Some(NormalizedReport {
            sample_date: row.get(0)?,
            sample_date_parsed: NaiveDate::parse_from_str(&parsed, "%Y-%m-%d")
                .with_context(|| format!("stored date {:?}", parsed))?,
            ramp_site: row.get(2)?,
            catch_area: row.get(3)?,
            interviews: row.get(4)?,
            anglers: row.get(5)?,
            chinook_per_angler: row.get(6)?,
            catches,
            ramp_id: row.get(tail)?,
            catch_area_id: row.get(tail + 1)?,
        }))
    }

    fn exists(&self, conn: &Connection, key: &NaturalKey) -> Result<bool> {
        let date = iso_date(key.sample_date);
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM report WHERE sample_date_parsed = CAST(? AS DATE) AND ramp_id = ? AND catch_area_id = ?",
            params![date, key.ramp_id, key.catch_area_id],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }
}

#[async_trait]
impl ReportStore for DuckStore {
    async fn ramps(&self) -> Result<Vec<ReferenceRow>> {
        self.list_reference("ramps")
    }

    async fn catch_areas(&self) -> Result<Vec<ReferenceRow>> {
        self.list_reference("catcharea")
    }

    async fn upsert_report(&self, report: &NormalizedReport) -> Result<UpsertOutcome> {
        let key = report.key();
        let conn = self.conn()?;
        let existed = self
            .exists(&conn, &key)
            .with_context(|| format!("checking report {}", key))?;

        let date = iso_date(report.sample_date_parsed);
        let catches: Vec<Option<i32>> = report.catches.iter().map(|(_, n)| n).collect();
        let mut values: Vec<&dyn ToSql> = vec![
            &report.sample_date as &dyn ToSql,
            &date as &dyn ToSql,
            &report.ramp_site as &dyn ToSql,
            &report.catch_area as &dyn ToSql,
            &report.interviews as &dyn ToSql,
            &report.anglers as &dyn ToSql,
            &report.chinook_per_angler as &dyn ToSql,
        ];
        values.extend(catches.iter().map(|c| c as &dyn ToSql));
        values.push(&report.ramp_id as &dyn ToSql);
        values.push(&report.catch_area_id as &dyn ToSql);

        conn.execute(&self.upsert_sql, values.as_slice())
            .with_context(|| format!("upserting report {}", key))?;
        debug!(%key, existed, "upserted report");

        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    async fn report_exists(&self, key: &NaturalKey) -> Result<bool> {
        let conn = self.conn()?;
        self.exists(&conn, key)
            .with_context(|| format!("checking report {}", key))
    }

    fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| anyhow!("duckdb connection mutex poisoned"))?;
        conn.close()
            .map_err(|(_, e)| e)
            .context("closing duckdb connection")?;
        info!("closed report store");
        Ok(())
    }
}
