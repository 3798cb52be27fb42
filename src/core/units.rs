use crate::statistics::mean;
use fsum::FSum;
use thiserror::Error;

pub const HOURS_PER_DAY: u32 = 24;
pub const DAYS_PER_YEAR: u32 = 365;
pub const ABSOLUTE_ZERO_CELSIUS: f64 = -273.15;

pub(crate) fn celsius_to_kelvin(temp_c: f64) -> Result<f64, BelowAbsoluteZeroError> {
    if temp_c < ABSOLUTE_ZERO_CELSIUS {
        Err(BelowAbsoluteZeroError::from_c(temp_c))
    } else {
        Ok(temp_c - ABSOLUTE_ZERO_CELSIUS)
    }
}

/// Split an hourly series into consecutive day blocks of 24 values.
///
/// A trailing block shorter than a full day is returned as-is, so callers can
/// tell it apart by its length.
pub fn day_blocks(hourly: &[f64]) -> std::slice::Chunks<'_, f64> {
    hourly.chunks(HOURS_PER_DAY as usize)
}

/// Arithmetic mean of each day block of an hourly series (see `day_blocks`).
pub fn daily_means(hourly: &[f64]) -> Vec<f64> {
    day_blocks(hourly).map(mean).collect()
}

/// Sum of each day block of an hourly series, using compensated summation.
pub fn daily_totals(hourly: &[f64]) -> Vec<f64> {
    day_blocks(hourly)
        .map(|block| FSum::with_all(block.iter()).value())
        .collect()
}

#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("A temperature of {k}ºK/{}ºC was encountered, which is less than absolute zero", k + ABSOLUTE_ZERO_CELSIUS)]
pub struct BelowAbsoluteZeroError {
    k: f64,
}

impl BelowAbsoluteZeroError {
    fn from_c(c: f64) -> Self {
        Self {
            k: c - ABSOLUTE_ZERO_CELSIUS,
        }
    }
}
