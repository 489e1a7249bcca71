//! Reconstruction of past compartment occupancy from observed counts.
//!
//! Every confirmed case is assumed to have been exposed for `D_incubation`
//! days and infectious for `D_infectious` days before confirmation, and mild
//! cases to recover `D_recovery_mild` days after it. Hospital and death
//! compartments come straight from the observed ward, ICU and death counts.
//! Durations are rounded to whole days.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::model::{Compartment, StateVector};
use crate::output::{UFState, project, round_half_up};
use crate::parameters::{ModelParameters, ReconstructionConfig};

/// Day-indexed observations, as written by the data refresh job.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSeries {
    /// Epoch milliseconds of day 0.
    pub epidemy_start_date: i64,
    pub days: usize,
    #[serde(default, deserialize_with = "day_indexed")]
    pub new_confirmed_cases: Vec<f64>,
    #[serde(default, deserialize_with = "day_indexed")]
    pub cumulative_confirmed_deaths: Vec<f64>,
    #[serde(default, deserialize_with = "day_indexed")]
    pub active_hospitalizations: Vec<f64>,
    #[serde(rename = "activeICU", default, deserialize_with = "day_indexed")]
    pub active_icu: Vec<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DayValues {
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// Day keys at or past this bound are ignored.
const MAX_DAY_KEY: usize = 100_000;

/// Accepts `[v0, v1, ...]` or `{"0": v0, "1": v1, ...}`. Anything that is
/// not a number reads as 0.
fn day_indexed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let count = |v: &Value| v.as_f64().unwrap_or(0.0);
    Ok(match DayValues::deserialize(deserializer)? {
        DayValues::List(values) => values.iter().map(count).collect(),
        DayValues::Map(entries) => {
            let indexed: Vec<(usize, f64)> = entries
                .iter()
                .filter_map(|(day, v)| day.parse::<usize>().ok().map(|day| (day, count(v))))
                .filter(|&(day, _)| day < MAX_DAY_KEY)
                .collect();
            let len = indexed.iter().map(|(day, _)| day + 1).max().unwrap_or(0);
            let mut values = vec![0.0; len];
            for (day, v) in indexed {
                values[day] = v;
            }
            values
        }
    })
}

fn at(series: &[f64], day: i64) -> f64 {
    usize::try_from(day)
        .ok()
        .and_then(|day| series.get(day))
        .copied()
        .unwrap_or(0.0)
}

impl HistoricalSeries {
    pub fn start_date(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp_millis(self.epidemy_start_date).map(|dt| dt.date_naive())
    }

    pub fn new_confirmed_cases(&self, day: i64) -> f64 {
        at(&self.new_confirmed_cases, day)
    }

    pub fn cumulative_confirmed_deaths(&self, day: i64) -> f64 {
        at(&self.cumulative_confirmed_deaths, day)
    }

    /// Ward plus ICU patients.
    pub fn hospital_load(&self, day: i64) -> f64 {
        at(&self.active_hospitalizations, day) + at(&self.active_icu, day)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub epidemy_start_date: i64,
    /// One state per day from day 0.
    pub states: Vec<StateVector>,
    pub projected: Vec<UFState>,
    /// Hospital load implied by `P_severe`, for comparison with the observed
    /// load only.
    pub expected_hospitalized: Vec<f64>,
}

impl Reconstruction {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Per-day head-counts over `[-shift, days)`.
struct Counts {
    shift: i64,
    compartments: Vec<StateVector>,
    expected_hospitalized: Vec<f64>,
}

impl Counts {
    fn new(shift: i64, days: i64) -> Self {
        let len = (days + shift).max(0) as usize;
        Self {
            shift,
            compartments: vec![StateVector::zeros(); len],
            expected_hospitalized: vec![0.0; len],
        }
    }

    fn slot(&self, day: i64) -> Option<usize> {
        usize::try_from(day + self.shift)
            .ok()
            .filter(|&i| i < self.compartments.len())
    }

    fn add(&mut self, compartment: Compartment, days: impl Iterator<Item = i64>, count: f64) {
        for day in days {
            if let Some(i) = self.slot(day) {
                self.compartments[i][compartment.index()] += count;
            }
        }
    }

    fn set(&mut self, compartment: Compartment, day: i64, count: f64) {
        if let Some(i) = self.slot(day) {
            self.compartments[i][compartment.index()] = count;
        }
    }
}

fn whole_days(duration: f64) -> i64 {
    round_half_up(duration) as i64
}

pub fn reconstruct(
    series: &HistoricalSeries,
    params: &ModelParameters,
    config: &ReconstructionConfig,
) -> Reconstruction {
    use Compartment::*;

    let days = series.days as i64;
    let shift = whole_days(params.d_incubation + params.d_infectious);
    let incubation = whole_days(params.d_incubation);
    let infectious = whole_days(params.d_infectious);
    let mild = whole_days(params.d_recovery_mild);
    let hospital_stay = whole_days(params.d_recovery_severe);
    let fatal_share = if params.case_fatality_rate + params.p_severe > 0.0 {
        params.case_fatality_rate / (params.case_fatality_rate + params.p_severe)
    } else {
        0.0
    };

    let mut counts = Counts::new(shift, days);
    for day in 0..days {
        let deaths = round_half_up(
            series.cumulative_confirmed_deaths(day) / (1.0 - config.unrecorded_deaths_fraction),
        );
        counts.set(Dead, day, deaths);

        let load = series.hospital_load(day);
        let will_die = round_half_up(fatal_share * load);
        counts.set(HospitalWillDie, day, will_die);
        counts.set(HospitalWillRecover, day, load - will_die);

        let cases = round_half_up(series.new_confirmed_cases(day) / (1.0 - config.undetected_fraction));
        if cases == 0.0 {
            continue;
        }
        let infectious_start = day - infectious + 1;
        counts.add(Infectious, infectious_start..=day, cases);
        counts.add(Exposed, infectious_start - incubation..infectious_start, cases);

        let mild_cases = cases * params.p_mild();
        counts.add(RecoveringMild, day + 1..=day + mild, mild_cases);
        counts.add(RecoveredMild, day + mild + 1..days, mild_cases);

        let severe_cases = cases * params.p_severe;
        for d in day + 1..=day + hospital_stay {
            if let Some(i) = counts.slot(d) {
                counts.expected_hospitalized[i] += severe_cases;
            }
        }
        counts.add(RecoveredSevere, day + hospital_stay + 1..days, severe_cases);
    }

    // Day 0 is the epidemic start; the last `shift` days lack the lookahead
    // needed to place their exposures.
    let first = shift as usize;
    let last = (days - shift).max(0) as usize + first;
    let kept = first..last.max(first);
    let n = params.population;

    let states: Vec<StateVector> = counts.compartments[kept.clone()]
        .iter()
        .map(|c| {
            let mut state = *c / n;
            let others: f64 = state.iter().skip(1).sum();
            state[Susceptible.index()] = 1.0 - others;
            state
        })
        .collect();

    let projected = states
        .iter()
        .enumerate()
        .map(|(day, state)| {
            let day = day as i64;
            UFState {
                hospitalized: at(&series.active_hospitalizations, day) as u64,
                icu: at(&series.active_icu, day) as u64,
                ..project(state, n, 0.0)
            }
        })
        .collect();

    if let Some(date) = series.start_date() {
        info!("reconstructed {} days of history from {date}", states.len());
    }
    debug!(
        "reconstruction windows: incubation {incubation}, infectious {infectious}, mild {mild}, hospital {hospital_stay}, shift {shift}"
    );

    Reconstruction {
        epidemy_start_date: series.epidemy_start_date,
        states,
        projected,
        expected_hospitalized: counts.expected_hospitalized[kept].to_vec(),
    }
}
