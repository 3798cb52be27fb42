use crate::core::energy_supply::utilization_factor::UtilizationFactorModel;
use crate::core::heating_systems::heat_pump_cop::{CompressionMode, Icing};
use crate::era5_request::Era5Request;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::type_name;
use std::io::{BufReader, Read};

fn ingest<T: DeserializeOwned>(json: impl Read) -> anyhow::Result<T> {
    serde_json::from_reader(BufReader::new(json))
        .with_context(|| format!("could not read {} from JSON", short_type_name::<T>()))
}

fn short_type_name<T>() -> &'static str {
    let name = type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

/// Read fitted airmass and temperature models, and their weights, e.g. as written by a
/// previous fitting run.
pub fn ingest_utilization_factor_model(json: impl Read) -> anyhow::Result<UtilizationFactorModel> {
    let model: UtilizationFactorModel = ingest(json)?;
    if !model.airmass.threshold.is_finite() || !model.temperature.threshold.is_finite() {
        anyhow::bail!("utilization factor model thresholds must be finite numbers");
    }
    Ok(model)
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeatPumpInput {
    pub mode: CompressionMode,
    pub quality_grade: f64,
    #[serde(default)]
    pub icing: Option<Icing>,
}

pub fn ingest_heat_pump(json: impl Read) -> anyhow::Result<HeatPumpInput> {
    let input: HeatPumpInput = ingest(json)?;
    if !(input.quality_grade > 0. && input.quality_grade <= 1.) {
        anyhow::bail!(
            "heat pump quality grade must be above 0 and at most 1, got {}",
            input.quality_grade
        );
    }
    Ok(input)
}

pub fn ingest_era5_request(json: impl Read) -> anyhow::Result<Era5Request> {
    ingest(json)
}
