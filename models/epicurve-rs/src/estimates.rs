//! Loader for precomputed per-day compartment estimates.
//!
//! The export carries free-form rows before and after the data. Rows whose
//! `Date` does not parse are skipped until the first dated row; after that the
//! first undated row ends the table.

use std::io::Read;

use chrono::NaiveDate;
use log::debug;

use crate::error::Result;
use crate::model::{Compartment, StateVector};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y"];

const COLUMNS: [&str; 9] = [
    "Exposed",
    "Infectious",
    "Mild",
    "SevereHome",
    "HospitalWillRecover",
    "HospitalFatal",
    "RecoveredMild",
    "RecoveredSevere",
    "Fatal",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedEstimates {
    pub first_date: Option<NaiveDate>,
    pub states: Vec<StateVector>,
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// Whole head-count; fractions are truncated and anything unparseable reads
/// as 0.
fn parse_count(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map_or(0.0, f64::trunc)
}

pub fn load_precomputed_estimates<R: Read>(reader: R, population: f64) -> Result<PrecomputedEstimates> {
    use Compartment::*;

    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let date_column = column("Date");
    let count_columns = COLUMNS.map(|name| column(name));

    let mut first_date = None;
    let mut states = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let date = date_column
            .and_then(|i| record.get(i))
            .and_then(parse_date);
        let Some(date) = date else {
            if first_date.is_some() {
                break;
            }
            continue;
        };
        first_date.get_or_insert(date);

        let [exposed, infectious, mild, severe_home, will_recover, will_die, recovered_mild, recovered_severe, fatal] =
            count_columns.map(|i| {
                i.and_then(|i| record.get(i))
                    .map_or(0.0, parse_count)
            });

        let mut state = StateVector::zeros();
        state[Exposed.index()] = exposed;
        // Severe-at-home cases are counted as still infectious.
        state[Infectious.index()] = infectious + severe_home;
        state[RecoveringMild.index()] = mild;
        state[HospitalWillRecover.index()] = will_recover;
        state[HospitalWillDie.index()] = will_die;
        state[RecoveredMild.index()] = recovered_mild;
        state[RecoveredSevere.index()] = recovered_severe;
        state[Dead.index()] = fatal;
        state[Susceptible.index()] = population - state.sum();
        states.push(state / population);
    }
    debug!("loaded {} precomputed days starting {:?}", states.len(), first_date);
    Ok(PrecomputedEstimates { first_date, states })
}
