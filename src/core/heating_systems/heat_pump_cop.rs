//! This module calculates coefficients of performance of compression heat pumps and
//! chillers from the Carnot efficiency between their sink and source temperatures,
//! scaled by a quality grade.

use crate::core::units::{celsius_to_kelvin, BelowAbsoluteZeroError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMode {
    HeatPump,
    Chiller,
}

/// Heat pumps drawing heat from cold air lose performance to icing of the evaporator.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Icing {
    /// Source temperature below which icing occurs, in degrees C
    pub temp_threshold_icing: f64,
    /// COP multiplier applied while icing occurs
    pub factor_icing: f64,
}

fn carnot_cop(mode: CompressionMode, temp_high: f64, temp_low: f64) -> Result<f64, CopError> {
    let temp_high_k = celsius_to_kelvin(temp_high)?;
    let temp_low_k = celsius_to_kelvin(temp_low)?;
    let temp_diff = temp_high_k - temp_low_k;
    if temp_diff <= 0. {
        return Err(CopError::NonPositiveTemperatureLift {
            temp_high,
            temp_low,
        });
    }

    Ok(match mode {
        CompressionMode::HeatPump => temp_high_k / temp_diff,
        CompressionMode::Chiller => temp_low_k / temp_diff,
    })
}

/// Calculate the COP for each timestep.
///
/// Arguments:
/// * `mode` - whether the machine heats its sink or cools its source
/// * `temp_high` - sink temperatures (heat pump) or heat rejection temperatures (chiller),
///                 in degrees C; a single value applies to every timestep
/// * `temp_low` - source temperatures (heat pump) or cooled medium temperatures (chiller),
///                in degrees C; a single value applies to every timestep
/// * `quality_grade` - ratio of real to Carnot COP
/// * `icing` - icing losses of the heat pump source, if any
pub fn calculate_cops(
    mode: CompressionMode,
    temp_high: &[f64],
    temp_low: &[f64],
    quality_grade: f64,
    icing: Option<Icing>,
) -> Result<Vec<f64>, CopError> {
    if icing.is_some() && mode == CompressionMode::Chiller {
        return Err(CopError::IcingForChiller);
    }

    let timesteps = match (temp_high.len(), temp_low.len()) {
        (high, low) if high == low => high,
        (1, low) => low,
        (high, 1) => high,
        (high, low) => return Err(CopError::MismatchedSeriesLengths { high, low }),
    };
    let at = |series: &[f64], t_idx: usize| {
        if series.len() == 1 {
            series[0]
        } else {
            series[t_idx]
        }
    };

    (0..timesteps)
        .map(|t_idx| {
            let temp_high = at(temp_high, t_idx);
            let temp_low = at(temp_low, t_idx);
            let cop = quality_grade * carnot_cop(mode, temp_high, temp_low)?;

            Ok(match icing {
                Some(Icing {
                    temp_threshold_icing,
                    factor_icing,
                }) if temp_low < temp_threshold_icing => cop * factor_icing,
                _ => cop,
            })
        })
        .collect()
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CopError {
    #[error("Sink temperature series has {high} values but source temperature series has {low}")]
    MismatchedSeriesLengths { high: usize, low: usize },
    #[error("Sink temperature {temp_high}ºC must be above source temperature {temp_low}ºC")]
    NonPositiveTemperatureLift { temp_high: f64, temp_low: f64 },
    #[error("Icing only applies to heat pumps, not chillers")]
    IcingForChiller,
    #[error(transparent)]
    BelowAbsoluteZero(#[from] BelowAbsoluteZeroError),
}
