use log::warn;
use serde::{Deserialize, Serialize};

use crate::model::{Compartment, StateVector};

/// Head-counts shown to users for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UFState {
    pub susceptible: u64,
    pub infected: u64,
    /// Active hospitalizations outside intensive care.
    pub hospitalized: u64,
    pub icu: u64,
    /// Cumulative.
    pub recovered: u64,
    /// Cumulative.
    pub fatalities: u64,
}

/// Rounds ties toward positive infinity. `x - floor(x)` is exact, so values
/// just below a half never round up.
pub fn round_half_up(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 { floor + 1.0 } else { floor }
}

fn head_count(fraction: f64, population: f64) -> u64 {
    let count = fraction * population;
    if !count.is_finite() {
        warn!("non-finite compartment value {count}, reported as 0");
        return 0;
    }
    // saturating: negatives become 0
    round_half_up(count) as u64
}

pub fn project(state: &StateVector, population: f64, p_icu: f64) -> UFState {
    use Compartment::*;

    let c = |compartment: Compartment| state[compartment.index()];
    let hospital = c(HospitalWillRecover) + c(HospitalWillDie);
    UFState {
        susceptible: head_count(c(Susceptible), population),
        infected: head_count(
            c(Exposed) + c(Infectious) + c(RecoveringMild) + c(RecoveringSevereHome),
            population,
        ),
        hospitalized: head_count((1.0 - p_icu) * hospital, population),
        icu: head_count(p_icu * hospital, population),
        recovered: head_count(c(RecoveredMild) + c(RecoveredSevere), population),
        fatalities: head_count(c(Dead), population),
    }
}

pub fn project_all<'a>(
    states: impl IntoIterator<Item = &'a StateVector>,
    population: f64,
    p_icu: f64,
) -> Vec<UFState> {
    states
        .into_iter()
        .map(|state| project(state, population, p_icu))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(2.4999), 2.0);
        assert_eq!(round_half_up(0.0), 0.0);
        assert_eq!(round_half_up(0.49999999999999994), 0.0);
        assert_eq!(round_half_up(-0.5), 0.0);
        assert_eq!(round_half_up(4_503_599_627_370_495.5), 4_503_599_627_370_496.0);
    }

    #[test]
    fn test_projection() {
        let state = StateVector::from([0.5, 0.1, 0.1, 0.05, 0.05, 0.04, 0.01, 0.06, 0.04, 0.05]);
        let uf = project(&state, 1000.0, 0.2);
        assert_eq!(
            uf,
            UFState {
                susceptible: 500,
                infected: 300,
                hospitalized: 40,
                icu: 10,
                recovered: 100,
                fatalities: 50,
            }
        );
    }

    #[test]
    fn test_independent_hospital_rounding() {
        // 5 patients split 50/50: both halves round up to 3.
        let mut state = StateVector::zeros();
        state[Compartment::Susceptible.index()] = 0.995;
        state[Compartment::HospitalWillRecover.index()] = 0.005;
        let uf = project(&state, 1000.0, 0.5);
        assert_eq!(uf.hospitalized, 3);
        assert_eq!(uf.icu, 3);
    }

    #[test]
    fn test_non_finite_reports_zero() {
        let mut state = StateVector::zeros();
        state[Compartment::Exposed.index()] = f64::NAN;
        state[Compartment::Dead.index()] = f64::INFINITY;
        state[Compartment::RecoveredMild.index()] = f64::NEG_INFINITY;
        let uf = project(&state, 1000.0, 0.0);
        assert_eq!(uf.infected, 0);
        assert_eq!(uf.fatalities, 0);
        assert_eq!(uf.recovered, 0);
    }

    #[test]
    fn test_project_all() {
        let states = vec![StateVector::zeros(); 3];
        assert_eq!(project_all(&states, 10.0, 0.1), vec![UFState::default(); 3]);
    }
}
