mod compare_floats;
pub mod core;
pub mod era5_request;
pub mod errors;
pub mod input;
pub mod output;
pub mod read_csv_file;
mod statistics;

#[macro_use]
extern crate is_close;

use crate::core::energy_supply::utilization_factor::{
    fit_two_segments, BreakpointSelection, TwoSegmentFit,
};
use crate::core::heating_systems::heat_pump_cop::calculate_cops;
use crate::core::space_heat_demand::heating_limit::adjust_heat_demand;
use crate::errors::{CalculationError, PvcompareError};
use crate::input::{ingest_era5_request, ingest_heat_pump, ingest_utilization_factor_model};
use crate::output::{write_columns_file, write_json_file, Output};
use crate::read_csv_file::{read_cop_temperatures, read_drivers, read_heat_demand, read_samples};
use serde_json::Value;
use std::io::Read;
use tracing::{info, instrument};

/// Fit a two-segment utilization factor model to (driver, ratio) samples and write it out
/// as JSON under the key "two_segment_fit".
#[instrument(skip_all)]
pub fn run_fit(
    samples: impl Read,
    output: impl Output,
    breakpoint: BreakpointSelection,
) -> Result<TwoSegmentFit, PvcompareError> {
    let (x, y) = read_samples(samples)?;
    info!(samples = x.len(), ?breakpoint, "fitting two-segment model");

    let fit = fit_two_segments(&x, &y, breakpoint).map_err(CalculationError::from)?;
    info!(
        threshold = fit.threshold,
        total_rmsd = fit.total_rmsd(),
        "fitted two-segment model"
    );

    write_json_file(&output, "two_segment_fit", &fit).map_err(PvcompareError::ErrorInOutput)?;

    Ok(fit)
}

/// Evaluate a combined airmass and temperature utilization factor model for each row of a
/// driver series, writing the factors under the key "utilization_factor".
#[instrument(skip_all)]
pub fn run_utilization_factor(
    model: impl Read,
    drivers: impl Read,
    output: impl Output,
) -> Result<Vec<f64>, PvcompareError> {
    let model = ingest_utilization_factor_model(model)?;
    let (airmass, temperature) = read_drivers(drivers)?;

    let factors = model
        .utilization_factor_series(&airmass, &temperature)
        .map_err(CalculationError::from)?;
    info!(timesteps = factors.len(), "calculated utilization factors");

    write_columns_file(
        &output,
        "utilization_factor",
        &["airmass", "temperature", "utilization_factor"],
        &[&airmass, &temperature, &factors],
    )
    .map_err(PvcompareError::ErrorInOutput)?;

    Ok(factors)
}

/// Zero heat demand on days at or above the heating limit temperature and redistribute it,
/// writing the adjusted series under the key "adjusted_heat_demand".
#[instrument(skip(series, output))]
pub fn run_heat_demand_adjustment(
    series: impl Read,
    heating_limit_temperature: f64,
    output: impl Output,
) -> Result<Vec<f64>, PvcompareError> {
    let (temperature, demand) = read_heat_demand(series)?;

    let adjusted = adjust_heat_demand(&temperature, heating_limit_temperature, &demand)
        .map_err(CalculationError::from)?;
    info!(
        hours = adjusted.len(),
        total_demand = adjusted.iter().sum::<f64>(),
        "adjusted heat demand"
    );

    write_columns_file(
        &output,
        "adjusted_heat_demand",
        &["temperature", "demand"],
        &[&temperature, &adjusted],
    )
    .map_err(PvcompareError::ErrorInOutput)?;

    Ok(adjusted)
}

/// Calculate heat pump or chiller COPs for each row of a temperature series, writing them
/// under the key "cop".
#[instrument(skip_all)]
pub fn run_cops(
    heat_pump: impl Read,
    series: impl Read,
    output: impl Output,
) -> Result<Vec<f64>, PvcompareError> {
    let heat_pump = ingest_heat_pump(heat_pump)?;
    let (temp_high, temp_low) = read_cop_temperatures(series)?;

    let cops = calculate_cops(
        heat_pump.mode,
        &temp_high,
        &temp_low,
        heat_pump.quality_grade,
        heat_pump.icing,
    )
    .map_err(CalculationError::from)?;
    info!(mode = ?heat_pump.mode, timesteps = cops.len(), "calculated COPs");

    write_columns_file(
        &output,
        "cop",
        &["temp_high", "temp_low", "cop"],
        &[&temp_high, &temp_low, &cops],
    )
    .map_err(PvcompareError::ErrorInOutput)?;

    Ok(cops)
}

/// Render the CDS request body for an ERA5 download described in JSON.
pub fn render_era5_request(request: impl Read) -> Result<Value, PvcompareError> {
    let request = ingest_era5_request(request)?;
    Ok(request.to_cds_request().map_err(CalculationError::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::energy_supply::utilization_factor::UtilizationFactorError;
    use crate::core::space_heat_demand::heating_limit::HeatDemandError;
    use crate::output::SinkOutput;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_run_fit_from_csv() {
        let csv = "x,y\n1,0.8\n2,0.9\n3,1.0\n4,0.9\n5,0.7\n6,0.5\n";

        let fit = run_fit(csv.as_bytes(), SinkOutput, BreakpointSelection::Forced(3.5)).unwrap();

        assert_relative_eq!(fit.threshold, 10. / 3., epsilon = 1e-9);
    }

    #[rstest]
    fn should_classify_degenerate_fit_as_calculation_failure() {
        let csv = "x,y\n1,1\n2,1\n3,1\n4,2\n5,2\n6,2\n";

        let result = run_fit(csv.as_bytes(), SinkOutput, BreakpointSelection::Forced(3.5));

        assert!(matches!(
            result,
            Err(PvcompareError::FailureInCalculation(
                CalculationError::UtilizationFactor(UtilizationFactorError::DegenerateFit { .. })
            ))
        ));
    }

    #[rstest]
    fn should_classify_bad_csv_as_invalid_input() {
        let result = run_fit("a,b\n1,2\n".as_bytes(), SinkOutput, Default::default());

        assert!(matches!(result, Err(PvcompareError::InvalidInput(_))));
    }

    #[rstest]
    fn should_run_heat_demand_adjustment() {
        let mut csv = String::from("temperature,demand\n");
        for hour in 0..48 {
            let temperature = if hour < 24 { 20 } else { 5 };
            csv.push_str(&format!("{temperature},10\n"));
        }

        let adjusted = run_heat_demand_adjustment(csv.as_bytes(), 15., SinkOutput).unwrap();

        assert_eq!(adjusted[..24], vec![0.; 24][..]);
        assert_eq!(adjusted[24..], vec![20.; 24][..]);
    }

    #[rstest]
    fn should_surface_heat_demand_errors() {
        let csv = "temperature,demand\n25,1\n25,1\n";

        let result = run_heat_demand_adjustment(csv.as_bytes(), 15., SinkOutput);

        assert!(matches!(
            result,
            Err(PvcompareError::FailureInCalculation(
                CalculationError::HeatDemand(HeatDemandError::NoActiveHours { .. })
            ))
        ));
    }

    #[rstest]
    fn should_run_utilization_factor() {
        let model = r#"{
            "airmass": {
                "low": {"slope": 0.1, "intercept": 0.7, "rmsd": 0.0},
                "high": {"slope": -0.2, "intercept": 1.7, "rmsd": 0.0},
                "threshold": 3.0
            },
            "temperature": {
                "low": {"slope": 0.0, "intercept": 1.0, "rmsd": 0.0},
                "high": {"slope": -0.01, "intercept": 1.25, "rmsd": 0.0},
                "threshold": 25.0
            },
            "weight_airmass": 0.5,
            "weight_temperature": 0.5
        }"#;
        let drivers = "airmass,temperature\n3,25\n4,35\n";

        let factors =
            run_utilization_factor(model.as_bytes(), drivers.as_bytes(), SinkOutput).unwrap();

        assert_relative_eq!(factors[0], 1.);
        assert_relative_eq!(factors[1], 0.5 * 0.8 + 0.5 * 0.9, epsilon = 1e-12);
    }

    #[rstest]
    fn should_run_cops() {
        let heat_pump = r#"{"mode": "heat_pump", "quality_grade": 0.5}"#;
        let series = "temp_high,temp_low\n40,0\n40,20\n";

        let cops = run_cops(heat_pump.as_bytes(), series.as_bytes(), SinkOutput).unwrap();

        assert_relative_eq!(cops[0], 0.5 * 313.15 / 40., max_relative = 1e-12);
        assert_relative_eq!(cops[1], 0.5 * 313.15 / 20., max_relative = 1e-12);
    }

    #[rstest]
    fn should_render_era5_request() {
        let request = r#"{
            "start_date": "2019-06-01",
            "end_date": "2019-06-30",
            "variable": "pvlib",
            "position": {"latitude": 52.5, "longitude": 13.4},
            "target_file": "berlin_june.nc"
        }"#;

        let body = render_era5_request(request.as_bytes()).unwrap();

        assert_eq!(body["date"], "2019-06-01/2019-06-30");
    }
}
