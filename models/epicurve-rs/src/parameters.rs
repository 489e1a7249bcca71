use serde::Deserialize;

use crate::error::{Error, Result, ensure};
use crate::integrator::Method;
use crate::intervention::ActionMarker;
use crate::model::VariantKind;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelParameters {
    /// Population size N.
    pub population: f64,
    pub r0: f64,
    pub d_incubation: f64,
    pub d_infectious: f64,
    pub d_recovery_mild: f64,
    /// Days a severe case spends at home before admission.
    pub d_hospital_lag: f64,
    /// Days in hospital for patients who recover.
    pub d_recovery_severe: f64,
    pub d_death: f64,
    pub p_severe: f64,
    /// Share of hospitalized patients in intensive care.
    pub p_icu: f64,
    #[serde(alias = "cfr")]
    pub case_fatality_rate: f64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            population: 5_538_328.0,
            r0: 1.05,
            d_incubation: 5.2,
            d_infectious: 2.9,
            d_recovery_mild: 11.1,
            d_hospital_lag: 11.0,
            d_recovery_severe: 13.0,
            d_death: 18.0,
            p_severe: 0.028,
            p_icu: 0.25,
            case_fatality_rate: 0.006,
        }
    }
}

impl ModelParameters {
    /// Probability that an infectious case recovers without hospital care.
    pub fn p_mild(&self) -> f64 {
        1.0 - self.p_severe - self.case_fatality_rate
    }

    /// Rejects parameter sets the model cannot integrate. The model itself
    /// never re-checks these.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| move || Error::InvalidParameter(msg);
        ensure(
            self.population.is_finite() && self.population > 0.0,
            invalid(format!("population must be positive, got {}", self.population)),
        )?;
        ensure(
            self.r0.is_finite() && self.r0 > 0.0,
            invalid(format!("r0 must be positive, got {}", self.r0)),
        )?;
        for (name, value) in [
            ("d_incubation", self.d_incubation),
            ("d_infectious", self.d_infectious),
            ("d_recovery_mild", self.d_recovery_mild),
            ("d_hospital_lag", self.d_hospital_lag),
            ("d_recovery_severe", self.d_recovery_severe),
            ("d_death", self.d_death),
        ] {
            ensure(
                value.is_finite() && value > 0.0,
                invalid(format!("{name} must be a positive number of days, got {value}")),
            )?;
        }
        for (name, value) in [
            ("p_severe", self.p_severe),
            ("p_icu", self.p_icu),
            ("case_fatality_rate", self.case_fatality_rate),
        ] {
            ensure(
                (0.0..=1.0).contains(&value),
                invalid(format!("{name} must lie in [0, 1], got {value}")),
            )?;
        }
        ensure(
            self.p_severe + self.case_fatality_rate <= 1.0,
            invalid(format!(
                "p_severe + case_fatality_rate must not exceed 1, got {}",
                self.p_severe + self.case_fatality_rate
            )),
        )
    }
}

/// Fractions of the true counts missing from the observed series.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    pub undetected_fraction: f64,
    pub unrecorded_deaths_fraction: f64,
}

impl ReconstructionConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("undetected_fraction", self.undetected_fraction),
            ("unrecorded_deaths_fraction", self.unrecorded_deaths_fraction),
        ] {
            ensure((0.0..1.0).contains(&value), || {
                Error::InvalidParameter(format!("{name} must lie in [0, 1), got {value}"))
            })?;
        }
        Ok(())
    }
}

/// Which segments a run emits, and whether marker days count from the
/// epidemic start or from the start of the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Historical,
    Future,
    #[default]
    HistoricalAndFuture,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Integrator substeps per simulated day.
    pub interpolation_steps: u32,
    pub horizon_days: u32,
    pub samples_per_day: u32,
    /// Seed infections when no history is available.
    pub initial_infections: f64,
    pub method: Method,
    pub variant: VariantKind,
    pub display_mode: DisplayMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interpolation_steps: 40,
            horizon_days: 100,
            samples_per_day: 1,
            initial_infections: 1.0,
            method: Method::default(),
            variant: VariantKind::default(),
            display_mode: DisplayMode::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| move || Error::InvalidConfig(msg);
        ensure(
            self.interpolation_steps > 0,
            invalid("interpolation_steps must be positive".into()),
        )?;
        ensure(
            self.samples_per_day > 0 && self.interpolation_steps % self.samples_per_day == 0,
            invalid(format!(
                "samples_per_day ({}) must divide interpolation_steps ({})",
                self.samples_per_day, self.interpolation_steps
            )),
        )?;
        ensure(
            self.initial_infections.is_finite() && self.initial_infections >= 0.0,
            invalid(format!(
                "initial_infections must be non-negative, got {}",
                self.initial_infections
            )),
        )
    }

    /// Substeps between two emitted samples.
    pub fn sample_stride(&self) -> usize {
        (self.interpolation_steps / self.samples_per_day) as usize
    }
}

/// The `input` section of a run document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunInput {
    pub parameters: ModelParameters,
    pub simulation: SimulationConfig,
    pub reconstruction: ReconstructionConfig,
    /// `None` runs the default marker script.
    pub action_markers: Option<Vec<ActionMarker>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_valid() {
        ModelParameters::default().validate().unwrap();
        SimulationConfig::default().validate().unwrap();
        ReconstructionConfig::default().validate().unwrap();
        assert!((ModelParameters::default().p_mild() - 0.966).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let params = ModelParameters {
            d_infectious: 0.0,
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("d_infectious"), "{err}");
    }

    #[test]
    fn test_rejects_probability_overflow() {
        let params = ModelParameters {
            p_severe: 0.7,
            case_fatality_rate: 0.4,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_rejects_uneven_sampling() {
        let config = SimulationConfig {
            samples_per_day: 3,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        let config = SimulationConfig {
            samples_per_day: 4,
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.sample_stride(), 10);
    }

    #[test]
    fn test_rejects_full_undetected_fraction() {
        let config = ReconstructionConfig {
            undetected_fraction: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_input_from_json() {
        let input: RunInput = serde_json::from_value(json!({
            "parameters": { "r0": 2.5, "cfr": 0.01, "population": 1000000 },
            "simulation": {
                "horizon_days": 30,
                "method": "ssp43",
                "variant": "direct_admission",
                "display_mode": "future"
            },
            "action_markers": [{ "day": 12, "name": "Schools closed", "effect": 0.4 }]
        }))
        .unwrap();
        assert_eq!(input.parameters.r0, 2.5);
        assert_eq!(input.parameters.case_fatality_rate, 0.01);
        assert_eq!(input.parameters.d_incubation, 5.2);
        assert_eq!(input.simulation.horizon_days, 30);
        assert_eq!(input.simulation.interpolation_steps, 40);
        assert_eq!(input.simulation.method, Method::Ssp43);
        assert_eq!(input.simulation.variant, VariantKind::DirectAdmission);
        assert_eq!(input.simulation.display_mode, DisplayMode::Future);
        assert_eq!(input.action_markers.unwrap()[0].effect, Some(0.4));
    }
}
