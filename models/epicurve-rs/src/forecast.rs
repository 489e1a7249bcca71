use log::{info, warn};
use serde::Serialize;

use crate::error::Result;
use crate::estimates::PrecomputedEstimates;
use crate::history::{HistoricalSeries, reconstruct};
use crate::intervention::{ActionMarker, InterventionSchedule};
use crate::model::StateVector;
use crate::output::{UFState, project, project_all};
use crate::parameters::{DisplayMode, RunInput};
use crate::simulator::Simulator;

pub enum HistorySource<'a> {
    None,
    Observed(&'a HistoricalSeries),
    Precomputed(&'a PrecomputedEstimates),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Historical,
    Projected,
}

/// One output row. `day` counts from the epidemic start when projected rows
/// continue the history, otherwise from the simulation start, so it always
/// agrees with the day a marker is checked against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryRow {
    pub day: f64,
    pub segment: Segment,
    pub susceptible: u64,
    pub infected: u64,
    pub hospitalized: u64,
    pub icu: u64,
    pub recovered: u64,
    pub fatalities: u64,
}

impl TrajectoryRow {
    fn new(day: f64, segment: Segment, state: UFState) -> Self {
        Self {
            day,
            segment,
            susceptible: state.susceptible,
            infected: state.infected,
            hospitalized: state.hospitalized,
            icu: state.icu,
            recovered: state.recovered,
            fatalities: state.fatalities,
        }
    }

    pub fn state(&self) -> UFState {
        UFState {
            susceptible: self.susceptible,
            infected: self.infected,
            hospitalized: self.hospitalized,
            icu: self.icu,
            recovered: self.recovered,
            fatalities: self.fatalities,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub historical: Vec<TrajectoryRow>,
    pub projected: Vec<TrajectoryRow>,
    pub markers: Vec<ActionMarker>,
}

impl Forecast {
    pub fn run(input: &RunInput, history: HistorySource<'_>) -> Result<Self> {
        let params = &input.parameters;
        let config = &input.simulation;
        params.validate()?;
        config.validate()?;
        input.reconstruction.validate()?;
        let schedule = match &input.action_markers {
            Some(markers) => InterventionSchedule::new(markers.clone()),
            None => InterventionSchedule::default_script(),
        };
        schedule.validate()?;

        let (states, uf_states): (Vec<StateVector>, Vec<UFState>) = match history {
            HistorySource::None => (Vec::new(), Vec::new()),
            HistorySource::Observed(series) => {
                let r = reconstruct(series, params, &input.reconstruction);
                (r.states, r.projected)
            }
            HistorySource::Precomputed(estimates) => (
                estimates.states.clone(),
                project_all(&estimates.states, params.population, params.p_icu),
            ),
        };
        if states.is_empty() && config.display_mode != DisplayMode::Future {
            warn!(
                "no historical days available, simulating from {} seed infections",
                config.initial_infections
            );
        }

        let historical = match config.display_mode {
            DisplayMode::Future => Vec::new(),
            _ => uf_states
                .iter()
                .enumerate()
                .map(|(day, uf)| TrajectoryRow::new(day as f64, Segment::Historical, *uf))
                .collect(),
        };

        let projected = match config.display_mode {
            DisplayMode::Historical => Vec::new(),
            _ => {
                let tail = (!states.is_empty()).then_some(states.as_slice());
                let start_day = match config.display_mode {
                    DisplayMode::Future => 0.0,
                    _ => states.len().saturating_sub(1) as f64,
                };
                Simulator::new(params, &schedule, config)
                    .run(tail)
                    .into_iter()
                    .map(|sample| {
                        let uf = project(&sample.state, params.population, params.p_icu);
                        TrajectoryRow::new(start_day + sample.time, Segment::Projected, uf)
                    })
                    .collect()
            }
        };
        info!(
            "forecast ready: {} historical rows, {} projected rows",
            historical.len(),
            projected.len()
        );

        Ok(Self {
            historical,
            projected,
            markers: schedule.markers().to_vec(),
        })
    }

    /// Historical rows followed by projected rows.
    pub fn rows(&self) -> Vec<TrajectoryRow> {
        self.historical
            .iter()
            .chain(&self.projected)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::parameters::{ModelParameters, SimulationConfig};

    fn input(display_mode: DisplayMode) -> RunInput {
        RunInput {
            parameters: ModelParameters {
                population: 1_000_000.0,
                r0: 2.0,
                d_incubation: 5.0,
                d_infectious: 3.0,
                ..Default::default()
            },
            simulation: SimulationConfig {
                horizon_days: 20,
                initial_infections: 10.0,
                display_mode,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn series() -> HistoricalSeries {
        let days = 20;
        HistoricalSeries {
            epidemy_start_date: 1_583_020_800_000,
            days,
            new_confirmed_cases: (0..days).map(|d| 5.0 + d as f64).collect(),
            cumulative_confirmed_deaths: vec![0.0; days],
            active_hospitalizations: vec![3.0; days],
            active_icu: vec![1.0; days],
        }
    }

    #[test]
    fn test_historical_and_future_joins_without_duplicate_day() {
        let series = series();
        let forecast = Forecast::run(
            &input(DisplayMode::HistoricalAndFuture),
            HistorySource::Observed(&series),
        )
        .unwrap();
        assert_eq!(forecast.historical.len(), 12);
        assert_eq!(forecast.projected.len(), 20);
        assert_eq!(forecast.historical.last().unwrap().day, 11.0);
        assert_eq!(forecast.projected[0].day, 12.0);
        let days: Vec<f64> = forecast.rows().iter().map(|r| r.day).collect();
        assert!(days.windows(2).all(|w| w[1] - w[0] == 1.0));
        assert_eq!(forecast.historical[0].state().hospitalized, 3);
        assert_eq!(forecast.historical[0].state().icu, 1);
    }

    #[test]
    fn test_display_modes() {
        let series = series();
        let historical =
            Forecast::run(&input(DisplayMode::Historical), HistorySource::Observed(&series)).unwrap();
        assert!(historical.projected.is_empty());
        assert_eq!(historical.historical.len(), 12);

        let future = Forecast::run(&input(DisplayMode::Future), HistorySource::None).unwrap();
        assert!(future.historical.is_empty());
        assert_eq!(future.projected.len(), 21);
        assert_eq!(future.projected[0].day, 0.0);
        assert_eq!(future.projected[0].infected, 10);
    }

    fn with_markers(display_mode: DisplayMode, markers: Vec<ActionMarker>) -> RunInput {
        RunInput {
            action_markers: Some(markers),
            ..input(display_mode)
        }
    }

    fn infected_by_day(forecast: &Forecast) -> Vec<(f64, u64)> {
        forecast.projected.iter().map(|r| (r.day, r.infected)).collect()
    }

    fn infected_on(rows: &[(f64, u64)], day: f64) -> u64 {
        rows.iter().find(|r| r.0 == day).unwrap().1
    }

    #[test]
    fn test_future_rows_count_from_simulation_start() {
        let series = series();
        let run = |markers| {
            Forecast::run(
                &with_markers(DisplayMode::Future, markers),
                HistorySource::Observed(&series),
            )
            .unwrap()
        };
        let baseline = infected_by_day(&run(vec![]));
        let halved = infected_by_day(&run(vec![ActionMarker::new(3, "Distancing", Some(0.5))]));
        assert_eq!(baseline[0].0, 1.0);
        assert_eq!(halved.len(), 20);
        for (before, after) in baseline.iter().zip(&halved) {
            assert_eq!(before.0, after.0);
            if before.0 < 3.0 {
                assert_eq!(before, after);
            }
        }
        // two days of halved transmission show up in the head-counts
        assert!(infected_on(&halved, 5.0) < infected_on(&baseline, 5.0));
    }

    #[test]
    fn test_continued_rows_apply_markers_from_history_length() {
        // 12 historical days: a marker on day 15 is active from t = 3, which
        // is labelled day 14 because t = 0 is the last historical day, 11.
        let series = series();
        let run = |markers| {
            Forecast::run(
                &with_markers(DisplayMode::HistoricalAndFuture, markers),
                HistorySource::Observed(&series),
            )
            .unwrap()
        };
        let baseline = infected_by_day(&run(vec![]));
        let halved = infected_by_day(&run(vec![ActionMarker::new(15, "Distancing", Some(0.5))]));
        for (before, after) in baseline.iter().zip(&halved) {
            if before.0 < 14.0 {
                assert_eq!(before, after);
            }
        }
        assert!(infected_on(&halved, 16.0) < infected_on(&baseline, 16.0));
    }

    #[test]
    fn test_precomputed_history() {
        let mut state = StateVector::zeros();
        state[0] = 0.999;
        state[2] = 0.001;
        let estimates = PrecomputedEstimates {
            first_date: None,
            states: vec![state; 5],
        };
        let forecast = Forecast::run(
            &input(DisplayMode::HistoricalAndFuture),
            HistorySource::Precomputed(&estimates),
        )
        .unwrap();
        assert_eq!(forecast.historical.len(), 5);
        assert_eq!(forecast.historical[4].infected, 1000);
        assert_eq!(forecast.projected[0].day, 5.0);
    }

    #[test]
    fn test_default_markers_are_reported() {
        let forecast = Forecast::run(&input(DisplayMode::Future), HistorySource::None).unwrap();
        assert_eq!(forecast.markers, InterventionSchedule::default_script().markers());
    }

    #[test]
    fn test_rejects_invalid_input() {
        let mut bad = input(DisplayMode::Future);
        bad.parameters.d_incubation = -1.0;
        assert!(matches!(
            Forecast::run(&bad, HistorySource::None),
            Err(Error::InvalidParameter(_))
        ));

        let mut bad = input(DisplayMode::Future);
        bad.action_markers = Some(vec![ActionMarker::new(3, "Impossible", Some(-1.5))]);
        assert!(Forecast::run(&bad, HistorySource::None).is_err());
    }

    #[test]
    fn test_reproducible_output() {
        let series = series();
        let run = || {
            let forecast = Forecast::run(
                &input(DisplayMode::HistoricalAndFuture),
                HistorySource::Observed(&series),
            )
            .unwrap();
            mrp::csv_bytes(&forecast.rows()).unwrap()
        };
        let first = run();
        assert_eq!(mrp::digest(&first), mrp::digest(&run()));
        let text = String::from_utf8(first).unwrap();
        assert!(text.starts_with("day,segment,susceptible,infected,hospitalized,icu,recovered,fatalities\n"));
        assert!(text.contains(",historical,"));
        assert!(text.contains(",projected,"));
    }
}
