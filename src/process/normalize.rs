// src/process/normalize.rs

use std::fmt;

use crate::{
    model::{columns, Catches, NormalizedReport, Species},
    process::{
        csv_stream::RawRow,
        date_parser::parse_sample_date,
        utils::{parse_float_or_null, parse_int_or_null},
    },
    reference::ReferenceMaps,
};

/// Why a row was dropped. Only the date and the two reference names can
/// reject a row; bad measurements become nulls instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    BadDate(String),
    UnknownRamp(String),
    UnknownCatchArea(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::BadDate(raw) => write!(f, "invalid sample date {:?}", raw),
            Rejection::UnknownRamp(name) => write!(f, "ramp not found: {:?}", name),
            Rejection::UnknownCatchArea(name) => write!(f, "catch area not found: {:?}", name),
        }
    }
}

/// Turn one raw CSV row into a report, resolving ramp and catch area against `refs`.
pub fn normalize_row(row: &RawRow, refs: &ReferenceMaps) -> Result<NormalizedReport, Rejection> {
    let raw_date = row.get(columns::SAMPLE_DATE).unwrap_or("").trim();
    let ramp_site = row.get(columns::RAMP_SITE).unwrap_or("").trim();
    let catch_area = row.get(columns::CATCH_AREA).unwrap_or("").trim();

    let sample_date_parsed =
        parse_sample_date(raw_date).ok_or_else(|| Rejection::BadDate(raw_date.to_string()))?;

    let ramp_id = refs
        .ramp_id(ramp_site)
        .ok_or_else(|| Rejection::UnknownRamp(ramp_site.to_string()))?;
    let catch_area_id = refs
        .catch_area_id(catch_area)
        .ok_or_else(|| Rejection::UnknownCatchArea(catch_area.to_string()))?;

    let mut catches = Catches::default();
    for species in Species::ALL {
        catches.set(species, parse_int_or_null(row.get(species.csv_header())));
    }

    Ok(NormalizedReport {
        sample_date: raw_date.to_string(),
        sample_date_parsed,
        ramp_site: ramp_site.to_string(),
        catch_area: catch_area.to_string(),
        interviews: parse_int_or_null(row.get(columns::INTERVIEWS)),
        anglers: parse_int_or_null(row.get(columns::ANGLERS)),
        chinook_per_angler: parse_float_or_null(row.get(columns::CHINOOK_PER_ANGLER)),
        catches,
        ramp_id,
        catch_area_id,
    })
}
