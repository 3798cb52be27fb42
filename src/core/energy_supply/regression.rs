use crate::statistics::root_mean_square_deviation;
use polyfit_rs::polyfit_rs::polyfit;
use serde::{Deserialize, Serialize};

/// A straight line `y = slope * x + intercept` fitted to a set of samples,
/// together with the root-mean-square deviation of those samples from it.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegressionLine {
    pub slope: f64,
    pub intercept: f64,
    pub rmsd: f64,
}

impl RegressionLine {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit an ordinary least squares line through the given samples.
///
/// Arguments:
/// * `x` - driver values
/// * `y` - output ratios, same length as `x`
///
/// Fewer than two samples, or samples whose driver values are all identical,
/// do not determine a line and are rejected.
pub(crate) fn fit_line(x: &[f64], y: &[f64]) -> Result<RegressionLine, &'static str> {
    if x.len() != y.len() {
        return Err("driver and ratio series differ in length");
    }
    if x.len() < 2 {
        return Err("at least two samples are needed to fit a line");
    }
    if x.iter().all(|value| *value == x[0]) {
        return Err("all driver values are identical");
    }

    // coefficients come back lowest order first
    let coefficients = polyfit(x, y, 1)?;
    let (intercept, slope) = match coefficients[..] {
        [intercept, slope] => (intercept, slope),
        _ => return Err("linear fit did not return two coefficients"),
    };

    let predicted = x
        .iter()
        .map(|value| slope * value + intercept)
        .collect::<Vec<_>>();

    Ok(RegressionLine {
        slope,
        intercept,
        rmsd: root_mean_square_deviation(y, &predicted),
    })
}
