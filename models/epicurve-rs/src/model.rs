//! The ten-compartment transition model.
//!
//! Infectious cases leave `I` at rate `γ = 1 / D_infectious` and split three
//! ways: mild recoveries, severe cases that end up in hospital and fatal
//! cases. How severe cases reach hospital is the only thing the variants
//! disagree on, so each variant is a [`CompartmentModelVariant`] picked once
//! through [`VariantKind`].

use std::fmt::Debug;

use nalgebra::SVector;
use serde::Deserialize;

use crate::intervention::InterventionSchedule;
use crate::parameters::ModelParameters;

pub const COMPARTMENTS: usize = 10;

/// Fractions of the population, indexed by [`Compartment`]. Sums to one.
pub type StateVector = SVector<f64, COMPARTMENTS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compartment {
    Susceptible,
    Exposed,
    Infectious,
    RecoveringMild,
    /// Severe, not yet admitted.
    RecoveringSevereHome,
    HospitalWillRecover,
    HospitalWillDie,
    RecoveredMild,
    RecoveredSevere,
    Dead,
}

impl Compartment {
    pub const fn index(self) -> usize {
        self as usize
    }
}

pub fn seed_state(initial_infections: f64, population: f64) -> StateVector {
    let mut state = StateVector::zeros();
    state[Compartment::Susceptible.index()] = 1.0 - initial_infections / population;
    state[Compartment::Infectious.index()] = initial_infections / population;
    state
}

pub trait CompartmentModelVariant: Debug + Sync {
    fn name(&self) -> &'static str;

    /// Time derivative of `y` for transmission coefficient `beta`. The
    /// components sum to zero.
    fn derivative(&self, params: &ModelParameters, beta: f64, y: &StateVector) -> StateVector;
}

/// Flows shared by every variant. Returns the derivative without any
/// severe-case routing, plus the rate at which severe cases leave `I`.
fn shared_flows(params: &ModelParameters, beta: f64, y: &StateVector) -> (StateVector, f64) {
    use Compartment::*;

    let a = 1.0 / params.d_incubation;
    let gamma = 1.0 / params.d_infectious;

    let s = y[Susceptible.index()];
    let e = y[Exposed.index()];
    let i = y[Infectious.index()];
    let mild = y[RecoveringMild.index()];
    let fatal = y[HospitalWillDie.index()];

    let infection = beta * i * s;
    let recovery_mild = mild / params.d_recovery_mild;
    let death = fatal / params.d_death;

    let mut dy = StateVector::zeros();
    dy[Susceptible.index()] = -infection;
    dy[Exposed.index()] = infection - a * e;
    dy[Infectious.index()] = a * e - gamma * i;
    dy[RecoveringMild.index()] = params.p_mild() * gamma * i - recovery_mild;
    dy[HospitalWillDie.index()] = params.case_fatality_rate * gamma * i - death;
    dy[RecoveredMild.index()] = recovery_mild;
    dy[Dead.index()] = death;
    (dy, params.p_severe * gamma * i)
}

/// Severe cases wait `D_hospital_lag` days at home before admission.
#[derive(Debug, Clone, Copy, Default)]
pub struct HospitalLag;

impl CompartmentModelVariant for HospitalLag {
    fn name(&self) -> &'static str {
        "hospital_lag"
    }

    fn derivative(&self, params: &ModelParameters, beta: f64, y: &StateVector) -> StateVector {
        use Compartment::*;

        let (mut dy, severe) = shared_flows(params, beta, y);
        let admission = y[RecoveringSevereHome.index()] / params.d_hospital_lag;
        let discharge = y[HospitalWillRecover.index()] / params.d_recovery_severe;
        dy[RecoveringSevereHome.index()] = severe - admission;
        dy[HospitalWillRecover.index()] = admission - discharge;
        dy[RecoveredSevere.index()] = discharge;
        dy
    }
}

/// Severe cases are admitted as soon as they stop being infectious.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectAdmission;

impl CompartmentModelVariant for DirectAdmission {
    fn name(&self) -> &'static str {
        "direct_admission"
    }

    fn derivative(&self, params: &ModelParameters, beta: f64, y: &StateVector) -> StateVector {
        use Compartment::*;

        let (mut dy, severe) = shared_flows(params, beta, y);
        let discharge = y[HospitalWillRecover.index()] / params.d_recovery_severe;
        dy[HospitalWillRecover.index()] = severe - discharge;
        dy[RecoveredSevere.index()] = discharge;
        dy
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    #[default]
    HospitalLag,
    DirectAdmission,
}

impl VariantKind {
    pub fn model(self) -> &'static dyn CompartmentModelVariant {
        match self {
            VariantKind::HospitalLag => &HospitalLag,
            VariantKind::DirectAdmission => &DirectAdmission,
        }
    }
}

/// Couples a variant with the intervention schedule. Marker days count from
/// the epidemic start, so simulated time is shifted by `history_offset`.
#[derive(Debug, Clone, Copy)]
pub struct TransmissionModel<'a> {
    params: &'a ModelParameters,
    schedule: &'a InterventionSchedule,
    variant: &'static dyn CompartmentModelVariant,
    history_offset: f64,
}

impl<'a> TransmissionModel<'a> {
    pub fn new(
        params: &'a ModelParameters,
        schedule: &'a InterventionSchedule,
        variant: VariantKind,
        history_offset: f64,
    ) -> Self {
        Self {
            params,
            schedule,
            variant: variant.model(),
            history_offset,
        }
    }

    pub fn variant(&self) -> &'static dyn CompartmentModelVariant {
        self.variant
    }

    /// β(t) for simulated time `t`, in days since the simulation start.
    pub fn transmission_rate(&self, t: f64) -> f64 {
        self.params.r0 / self.params.d_infectious
            * self.schedule.multiplier_at(t + self.history_offset)
    }

    pub fn derivative(&self, t: f64, y: &StateVector) -> StateVector {
        self.variant
            .derivative(self.params, self.transmission_rate(t), y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervention::ActionMarker;
    use approx::assert_abs_diff_eq;

    fn busy_state() -> StateVector {
        StateVector::from([0.6, 0.08, 0.07, 0.05, 0.04, 0.03, 0.02, 0.05, 0.04, 0.02])
    }

    #[test]
    fn test_seed_state_sums_to_one() {
        let state = seed_state(10.0, 1_000_000.0);
        assert_abs_diff_eq!(state.sum(), 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(state[Compartment::Infectious.index()], 1e-5);
    }

    #[test]
    fn test_derivatives_conserve_population() {
        let params = ModelParameters::default();
        for kind in [VariantKind::HospitalLag, VariantKind::DirectAdmission] {
            let dy = kind.model().derivative(&params, 0.8, &busy_state());
            assert_abs_diff_eq!(dy.sum(), 0.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_direct_admission_skips_home_compartment() {
        let params = ModelParameters::default();
        let dy = DirectAdmission.derivative(&params, 0.8, &busy_state());
        assert_eq!(dy[Compartment::RecoveringSevereHome.index()], 0.0);
        let dy = HospitalLag.derivative(&params, 0.8, &busy_state());
        assert!(dy[Compartment::RecoveringSevereHome.index()] != 0.0);
    }

    #[test]
    fn test_infection_flow() {
        let params = ModelParameters::default();
        let y = busy_state();
        let dy = HospitalLag.derivative(&params, 0.5, &y);
        assert_abs_diff_eq!(dy[Compartment::Susceptible.index()], -0.5 * 0.07 * 0.6);
    }

    #[test]
    fn test_marker_halves_transmission() {
        let params = ModelParameters::default();
        let baseline = InterventionSchedule::default();
        let halved = InterventionSchedule::new(vec![ActionMarker::new(20, "Distancing", Some(0.5))]);
        let before = TransmissionModel::new(&params, &baseline, VariantKind::HospitalLag, 0.0);
        let after = TransmissionModel::new(&params, &halved, VariantKind::HospitalLag, 0.0);
        for step in 0..400 {
            let t = step as f64 * 0.25;
            let ratio = after.transmission_rate(t) / before.transmission_rate(t);
            if t >= 20.0 {
                assert_eq!(ratio, 0.5, "t = {t}");
            } else {
                assert_eq!(ratio, 1.0, "t = {t}");
            }
        }
    }

    #[test]
    fn test_history_offset_shifts_markers() {
        let params = ModelParameters::default();
        let schedule = InterventionSchedule::new(vec![ActionMarker::new(70, "Reopening", Some(0.3))]);
        let model = TransmissionModel::new(&params, &schedule, VariantKind::HospitalLag, 60.0);
        let base = params.r0 / params.d_infectious;
        assert_eq!(model.transmission_rate(9.9), base);
        assert_abs_diff_eq!(model.transmission_rate(10.0), base * 0.7, epsilon = 1e-15);
    }
}
