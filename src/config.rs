// src/config.rs

use std::{env, path::PathBuf};
use tracing::warn;

/// WDFW Puget Sound creel export.
pub const DEFAULT_CSV_URL: &str =
    "https://wdfw.wa.gov/fishing/reports/creel/puget-annual/export?_format=csv";
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_DATABASE_PATH: &str = "creel.duckdb";

/// Settings for one ingest run, normally read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `CSV_URL`: where to download the export from.
    pub csv_url: String,
    /// `CSV_PATH`: read a local export instead of downloading.
    pub csv_path: Option<PathBuf>,
    /// `SAMPLE_DATE_PARAM`: WDFW year selector appended as `sample_date=`.
    pub sample_date_param: Option<String>,
    /// `BATCH_SIZE`
    pub batch_size: usize,
    /// `DRY_RUN`: validate everything, write nothing.
    pub dry_run: bool,
    /// `DATABASE_PATH`
    pub database_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            csv_url: DEFAULT_CSV_URL.to_string(),
            csv_path: None,
            sample_date_param: None,
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key → value lookup. Empty values count as unset; an
    /// unusable `BATCH_SIZE` falls back to the default instead of failing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let batch_size = match get("BATCH_SIZE") {
            None => defaults.batch_size,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(value = %raw, default = DEFAULT_BATCH_SIZE, "invalid BATCH_SIZE; using default");
                    defaults.batch_size
                }
            },
        };

        Self {
            csv_url: get("CSV_URL").unwrap_or(defaults.csv_url),
            csv_path: get("CSV_PATH").map(PathBuf::from),
            sample_date_param: get("SAMPLE_DATE_PARAM"),
            batch_size,
            dry_run: get("DRY_RUN").map(|v| parse_flag(&v)).unwrap_or(false),
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
