//! Deterministic compartment-model forecasts of an epidemic: historical
//! reconstruction from observed counts, explicit Runge-Kutta simulation under
//! a schedule of interventions, and projection to rounded head-counts.

pub mod abm;
pub mod error;
pub mod estimates;
pub mod forecast;
pub mod history;
pub mod integrator;
pub mod intervention;
pub mod model;
pub mod output;
pub mod parameters;
pub mod simulator;

pub use error::{Error, Result};
pub use forecast::{Forecast, HistorySource, Segment, TrajectoryRow};
pub use intervention::{ActionMarker, InterventionSchedule};
pub use model::{Compartment, StateVector};
pub use output::UFState;
pub use parameters::{DisplayMode, ModelParameters, RunInput, SimulationConfig};
