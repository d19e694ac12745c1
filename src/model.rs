// src/model.rs

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::{fmt, str::FromStr};

/// Header names of the creel export. These are the only contract with the source.
pub mod columns {
    pub const SAMPLE_DATE: &str = "Sample date";
    pub const RAMP_SITE: &str = "Ramp/site";
    pub const CATCH_AREA: &str = "Catch area";
    pub const INTERVIEWS: &str = "# Interviews (Boat or Shore)";
    pub const ANGLERS: &str = "Anglers";
    pub const CHINOOK_PER_ANGLER: &str = "Chinook (per angler)";

    /// Columns without which no row can ever be accepted.
    pub const REQUIRED: [&str; 3] = [SAMPLE_DATE, RAMP_SITE, CATCH_AREA];
}

/// The species counted by the survey. Closed set: every variant owns exactly one
/// source column and one storage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Chinook,
    Coho,
    Chum,
    Pink,
    Sockeye,
    Lingcod,
    Halibut,
}

impl Species {
    pub const COUNT: usize = 7;

    pub const ALL: [Species; Species::COUNT] = [
        Species::Chinook,
        Species::Coho,
        Species::Chum,
        Species::Pink,
        Species::Sockeye,
        Species::Lingcod,
        Species::Halibut,
    ];

    /// Column header in the source CSV.
    pub fn csv_header(self) -> &'static str {
        match self {
            Species::Chinook => "Chinook",
            Species::Coho => "Coho",
            Species::Chum => "Chum",
            Species::Pink => "Pink",
            Species::Sockeye => "Sockeye",
            Species::Lingcod => "Lingcod",
            Species::Halibut => "Halibut",
        }
    }

    /// Column name in the `report` table.
    pub fn column(self) -> &'static str {
        match self {
            Species::Chinook => "chinook",
            Species::Coho => "coho",
            Species::Chum => "chum",
            Species::Pink => "pink",
            Species::Sockeye => "sockeye",
            Species::Lingcod => "lingcod",
            Species::Halibut => "halibut",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Species {
    type Err = anyhow::Error;

    /// Accepts the storage name or the CSV header, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Species::ALL
            .into_iter()
            .find(|sp| sp.column().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow!("unknown species `{}`", s))
    }
}

/// Per-species catch counts, `None` where the source value was missing or unparsable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Catches([Option<i32>; Species::COUNT]);

impl Catches {
    pub fn get(&self, species: Species) -> Option<i32> {
        self.0[species.index()]
    }

    pub fn set(&mut self, species: Species, count: Option<i32>) {
        self.0[species.index()] = count;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Species, Option<i32>)> + '_ {
        Species::ALL.into_iter().map(move |sp| (sp, self.get(sp)))
    }
}

/// Identity of a report: one survey per day, ramp and catch area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NaturalKey {
    pub sample_date: NaiveDate,
    pub ramp_id: i64,
    pub catch_area_id: i64,
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/ramp={}/area={}",
            self.sample_date, self.ramp_id, self.catch_area_id
        )
    }
}

/// A validated creel record, ready to be upserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReport {
    /// Date as displayed in the source, e.g. "Jan 5, 2024".
    pub sample_date: String,
    pub sample_date_parsed: NaiveDate,
    pub ramp_site: String,
    pub catch_area: String,
    pub interviews: Option<i32>,
    pub anglers: Option<i32>,
    pub chinook_per_angler: Option<f64>,
    pub catches: Catches,
    pub ramp_id: i64,
    pub catch_area_id: i64,
}

impl NormalizedReport {
    pub fn key(&self) -> NaturalKey {
        NaturalKey {
            sample_date: self.sample_date_parsed,
            ramp_id: self.ramp_id,
            catch_area_id: self.catch_area_id,
        }
    }

    pub fn catch(&self, species: Species) -> Option<i32> {
        self.catches.get(species)
    }
}

/// One row of a reference table (`ramps` or `catcharea`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRow {
    pub id: i64,
    pub name: String,
}

impl ReferenceRow {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
