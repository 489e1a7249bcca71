//! Maps daily output of the agent-based model onto [`UFState`]s.
//!
//! The agent-based model reports raw, unnormalised compartment values. They
//! are rescaled against the total of the first day, which stands in for the
//! simulated population, so any population drift in later days carries over
//! into the head-counts.

use serde::Deserialize;

use crate::output::{UFState, round_half_up};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AbmDay {
    #[serde(rename = "S")]
    pub susceptible: f64,
    #[serde(rename = "E")]
    pub incubating: f64,
    #[serde(rename = "A")]
    pub asymptomatic: f64,
    #[serde(rename = "X1")]
    pub asymptomatic_non_severe: f64,
    #[serde(rename = "X2")]
    pub symptomatic_non_severe: f64,
    #[serde(rename = "C1")]
    pub asymptomatic_severe_will_survive: f64,
    #[serde(rename = "C2")]
    pub symptomatic_severe_will_survive: f64,
    #[serde(rename = "C3")]
    pub hospitalized_severe_will_survive: f64,
    #[serde(rename = "D1")]
    pub asymptomatic_severe_will_die: f64,
    #[serde(rename = "D2")]
    pub symptomatic_severe_will_die: f64,
    #[serde(rename = "D3")]
    pub hospitalized_severe_will_die: f64,
    #[serde(rename = "HR1")]
    pub asymptomatic_non_critical_will_survive: f64,
    #[serde(rename = "HR2")]
    pub symptomatic_non_critical_will_survive: f64,
    #[serde(rename = "HR3")]
    pub hospitalized_non_critical_will_survive: f64,
    #[serde(rename = "HM1")]
    pub asymptomatic_non_critical_will_die: f64,
    #[serde(rename = "HM2")]
    pub symptomatic_non_critical_will_die: f64,
    #[serde(rename = "HM3")]
    pub hospitalized_non_critical_will_die: f64,
    #[serde(rename = "R")]
    pub recovered: f64,
    #[serde(rename = "M")]
    pub dead: f64,
}

impl AbmDay {
    pub fn total(&self) -> f64 {
        self.susceptible + self.infected() + self.hospitalized() + self.recovered + self.dead
    }

    fn infected(&self) -> f64 {
        self.incubating
            + self.asymptomatic
            + self.asymptomatic_non_severe
            + self.symptomatic_non_severe
            + self.asymptomatic_severe_will_survive
            + self.symptomatic_severe_will_survive
            + self.asymptomatic_severe_will_die
            + self.symptomatic_severe_will_die
            + self.asymptomatic_non_critical_will_survive
            + self.symptomatic_non_critical_will_survive
            + self.hospitalized_non_critical_will_survive
            + self.asymptomatic_non_critical_will_die
            + self.symptomatic_non_critical_will_die
            + self.hospitalized_non_critical_will_die
    }

    fn hospitalized(&self) -> f64 {
        self.hospitalized_severe_will_survive + self.hospitalized_severe_will_die
    }
}

pub fn map_abm_days(days: &[AbmDay], population: f64) -> Vec<UFState> {
    let Some(first) = days.first() else {
        return Vec::new();
    };
    let reference = first.total();
    let scale = |v: f64| round_half_up(v / reference * population) as u64;
    days.iter()
        .map(|day| {
            let hospitalized = scale(day.hospitalized());
            UFState {
                susceptible: scale(day.susceptible),
                infected: scale(day.infected()),
                hospitalized,
                // The model has no separate ICU compartment.
                icu: hospitalized,
                recovered: scale(day.recovered),
                fatalities: scale(day.dead),
            }
        })
        .collect()
}
