use log::debug;

use crate::integrator::{ButcherTableau, integrate};
use crate::intervention::InterventionSchedule;
use crate::model::{StateVector, TransmissionModel, seed_state};
use crate::parameters::{DisplayMode, ModelParameters, SimulationConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Days since the simulation start.
    pub time: f64,
    pub state: StateVector,
}

/// Runs the compartment model forward over a fixed horizon. Parameters and
/// config are expected to be validated by the caller.
pub struct Simulator<'a> {
    params: &'a ModelParameters,
    schedule: &'a InterventionSchedule,
    config: &'a SimulationConfig,
    tableau: ButcherTableau,
}

impl<'a> Simulator<'a> {
    pub fn new(
        params: &'a ModelParameters,
        schedule: &'a InterventionSchedule,
        config: &'a SimulationConfig,
    ) -> Self {
        Self {
            params,
            schedule,
            config,
            tableau: config.method.tableau(),
        }
    }

    /// Days added to simulated time before checking marker days. When
    /// continuing from history, t = 0 is the last historical day
    /// (`len - 1`) but is checked as day `len`, so a marker takes effect in
    /// the row labelled one day before it.
    pub fn history_offset(&self, history: Option<&[StateVector]>) -> f64 {
        match self.config.display_mode {
            DisplayMode::Future => 0.0,
            _ => history.map_or(0, <[_]>::len) as f64,
        }
    }

    pub fn model(&self, history: Option<&[StateVector]>) -> TransmissionModel<'a> {
        TransmissionModel::new(
            self.params,
            self.schedule,
            self.config.variant,
            self.history_offset(history),
        )
    }

    /// Samples the trajectory `samples_per_day` times a day, starting at the
    /// last historical state when one is given. That start state is already
    /// part of the history, so it is not emitted again.
    pub fn run(&self, history: Option<&[StateVector]>) -> Vec<Sample> {
        let tail = history.and_then(<[_]>::last);
        let start = tail
            .copied()
            .unwrap_or_else(|| seed_state(self.config.initial_infections, self.params.population));
        let model = self.model(history);

        let per_day = f64::from(self.config.interpolation_steps);
        let dt = 1.0 / per_day;
        let total = self.config.horizon_days as usize * self.config.interpolation_steps as usize;
        debug!(
            "simulating {} days with {:?} ({} substeps, {} model, offset {})",
            self.config.horizon_days,
            self.config.method,
            total,
            model.variant().name(),
            self.history_offset(history),
        );

        (0..=total)
            .scan(start, |y, k| {
                let time = k as f64 / per_day;
                let state = *y;
                if k < total {
                    *y = integrate(&self.tableau, |t, v| model.derivative(t, v), &state, time, dt);
                }
                Some(Sample { time, state })
            })
            .step_by(self.config.sample_stride())
            .skip(usize::from(tail.is_some()))
            .collect()
    }
}
