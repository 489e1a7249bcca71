use epicurve::abm::{AbmDay, map_abm_days};
use epicurve::estimates::load_precomputed_estimates;
use epicurve::history::HistoricalSeries;
use epicurve::{Forecast, HistorySource, RunInput};
use log::info;
use mrp::Environment;

fn main() -> Result<(), epicurve::Error> {
    let env = Environment::<RunInput>::load()?;
    mrp::init_logging(env.log_level)?;
    let input = &env.input;

    let series = if env.has_file("history") {
        Some(env.read_json_file::<HistoricalSeries>("history")?)
    } else {
        None
    };
    let estimates = match (&series, env.has_file("estimates")) {
        (None, true) => Some(load_precomputed_estimates(
            env.open_file("estimates")?,
            input.parameters.population,
        )?),
        _ => None,
    };
    let source = match (&series, &estimates) {
        (Some(series), _) => HistorySource::Observed(series),
        (None, Some(estimates)) => HistorySource::Precomputed(estimates),
        (None, None) => HistorySource::None,
    };

    let forecast = Forecast::run(input, source)?;
    env.write_csv("trajectory.csv", &forecast.rows())?;
    if env.output_dir().is_some() {
        env.write_json("action_markers.json", &forecast.markers)?;
    }

    if env.has_file("abm") {
        let days: Vec<AbmDay> = env.read_json_file("abm")?;
        info!("mapping {} agent-based model days", days.len());
        let uf = map_abm_days(&days, input.parameters.population);
        env.write_csv("abm_trajectory.csv", &uf)?;
    }
    Ok(())
}
