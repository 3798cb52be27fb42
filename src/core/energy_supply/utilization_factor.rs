//! This module fits the two-segment piecewise linear models behind the utilization
//! factors of concentrator and perovskite-silicon tandem cells, and evaluates them.
//!
//! A utilization factor corrects a physical output estimate for the effect of a
//! secondary driver (airmass, cell temperature). Below the breakpoint of a fit the
//! low segment applies, above it the high segment, and the factor equals exactly 1
//! at the breakpoint itself.

use crate::core::energy_supply::regression::{fit_line, RegressionLine};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Two slopes closer than this, in absolute terms, are treated as parallel, so their
/// intersection is undefined.
pub const PARALLEL_SLOPE_TOLERANCE: f64 = 1e-9;

/// Upper limit on the number of candidate breakpoints one search may scan.
pub const MAX_SEARCH_CANDIDATES: usize = 100_000;

/// Minimum number of samples each side of a breakpoint needs for a line to be fitted.
const MIN_SAMPLES_PER_SEGMENT: usize = 2;

/// Candidate breakpoints scanned when no breakpoint is forced, `min..=max` in `step`s.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchDomain {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SearchDomain {
    /// Airmass range used for concentrator cells.
    pub const AIRMASS: Self = Self {
        min: 1.5,
        max: 7.5,
        step: 0.1,
    };

    pub fn new(min: f64, max: f64, step: f64) -> Result<Self, UtilizationFactorError> {
        let domain = Self { min, max, step };
        domain.validate()?;
        Ok(domain)
    }

    fn validate(&self) -> Result<(), UtilizationFactorError> {
        if !(self.step > 0.) || !self.min.is_finite() || !self.max.is_finite() || self.min > self.max
        {
            return Err(UtilizationFactorError::InvalidSearchDomain(*self));
        }
        let steps = self.steps();
        if !steps.is_finite() || steps >= MAX_SEARCH_CANDIDATES as f64 {
            return Err(UtilizationFactorError::TooManyCandidates {
                domain: *self,
                limit: MAX_SEARCH_CANDIDATES,
            });
        }
        Ok(())
    }

    fn steps(&self) -> f64 {
        ((self.max - self.min) / self.step + 1e-9).floor()
    }

    /// Candidates in ascending order. Each is computed from its index rather than by
    /// repeated addition, so the last candidate lands on `max` when the range divides evenly.
    ///
    /// At most `MAX_SEARCH_CANDIDATES` are produced.
    pub fn candidates(&self) -> impl Iterator<Item = f64> {
        let Self { min, step, .. } = *self;
        let steps = self.steps();
        let count = if steps.is_finite() && steps > 0. {
            (steps as usize).min(MAX_SEARCH_CANDIDATES - 1)
        } else {
            0
        };
        (0..=count).map(move |idx| min + idx as f64 * step)
    }
}

impl Default for SearchDomain {
    fn default() -> Self {
        Self::AIRMASS
    }
}

/// How the breakpoint of a two-segment fit is chosen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BreakpointSelection {
    /// Split the samples at this driver value.
    Forced(f64),
    /// Scan the domain and keep the split with the lowest summed RMSD of both segments.
    Search(SearchDomain),
}

impl Default for BreakpointSelection {
    fn default() -> Self {
        Self::Search(SearchDomain::default())
    }
}

impl From<Option<f64>> for BreakpointSelection {
    fn from(forced_breakpoint: Option<f64>) -> Self {
        match forced_breakpoint {
            Some(breakpoint) => Self::Forced(breakpoint),
            None => Self::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TwoSegmentFit {
    pub low: RegressionLine,
    pub high: RegressionLine,
    /// Driver value where the two fitted lines intersect.
    pub threshold: f64,
}

impl TwoSegmentFit {
    fn from_segments(
        low: RegressionLine,
        high: RegressionLine,
    ) -> Result<Self, UtilizationFactorError> {
        if is_close!(
            low.slope,
            high.slope,
            rel_tol = 0.,
            abs_tol = PARALLEL_SLOPE_TOLERANCE
        ) {
            return Err(UtilizationFactorError::DegenerateFit {
                slope_low: low.slope,
                slope_high: high.slope,
            });
        }

        Ok(Self {
            low,
            high,
            threshold: (high.intercept - low.intercept) / (low.slope - high.slope),
        })
    }

    pub fn total_rmsd(&self) -> f64 {
        self.low.rmsd + self.high.rmsd
    }

    /// Utilization factor for a driver value.
    ///
    /// This is not the value of the fitted line: the slope of the applicable segment
    /// is applied to the distance from the threshold, offset from 1.
    pub fn evaluate(&self, x: f64) -> f64 {
        let slope = if x <= self.threshold {
            self.low.slope
        } else {
            self.high.slope
        };
        1. + (x - self.threshold) * slope
    }
}

/// Fit a two-segment piecewise linear model to (driver, ratio) samples.
///
/// Arguments:
/// * `x` - driver values (e.g. airmass or ambient temperature); need not be sorted or unique
/// * `y` - output ratios (e.g. normalised short-circuit current), same length as `x`
/// * `breakpoint` - a forced split, or the domain to search for the best split
///
/// Samples with `x` below the breakpoint form the low segment, the rest the high segment.
/// The threshold reported is the intersection of the two fitted lines, which in general
/// differs from the breakpoint used to split the samples.
pub fn fit_two_segments(
    x: &[f64],
    y: &[f64],
    breakpoint: BreakpointSelection,
) -> Result<TwoSegmentFit, UtilizationFactorError> {
    if x.len() != y.len() {
        return Err(UtilizationFactorError::InsufficientData(format!(
            "{} driver values were given against {} ratio values",
            x.len(),
            y.len()
        )));
    }

    let (low, high) = match breakpoint {
        BreakpointSelection::Forced(breakpoint) => fit_segments_at(x, y, breakpoint)?,
        BreakpointSelection::Search(domain) => search_segments(x, y, &domain)?,
    };

    TwoSegmentFit::from_segments(low, high)
}

fn search_segments(
    x: &[f64],
    y: &[f64],
    domain: &SearchDomain,
) -> Result<(RegressionLine, RegressionLine), UtilizationFactorError> {
    domain.validate()?;

    let mut skipped = 0usize;
    let fits = domain.candidates().filter_map(|candidate| {
        match fit_segments_at(x, y, candidate) {
            Ok((low, high)) => Some((candidate, low, high)),
            Err(_) => {
                skipped += 1;
                None
            }
        }
    });

    let (breakpoint, low, high) =
        lowest_total_rmsd(fits).ok_or(UtilizationFactorError::NoFeasibleBreakpoint {
            min: domain.min,
            max: domain.max,
        })?;
    debug!(
        breakpoint,
        total_rmsd = low.rmsd + high.rmsd,
        skipped,
        "selected breakpoint for two-segment fit"
    );

    Ok((low, high))
}

/// The candidate fit with the lowest summed RMSD of both segments. Of equally good
/// candidates, the first one wins.
fn lowest_total_rmsd(
    fits: impl IntoIterator<Item = (f64, RegressionLine, RegressionLine)>,
) -> Option<(f64, RegressionLine, RegressionLine)> {
    fits.into_iter().fold(None, |best, (candidate, low, high)| match best {
        Some((_, best_low, best_high))
            if best_low.rmsd + best_high.rmsd <= low.rmsd + high.rmsd =>
        {
            best
        }
        _ => Some((candidate, low, high)),
    })
}

fn fit_segments_at(
    x: &[f64],
    y: &[f64],
    breakpoint: f64,
) -> Result<(RegressionLine, RegressionLine), UtilizationFactorError> {
    let (low, high): (Vec<(f64, f64)>, Vec<(f64, f64)>) = x
        .iter()
        .copied()
        .zip(y.iter().copied())
        .partition(|(x, _)| *x < breakpoint);

    if low.len() < MIN_SAMPLES_PER_SEGMENT || high.len() < MIN_SAMPLES_PER_SEGMENT {
        return Err(UtilizationFactorError::InsufficientData(format!(
            "splitting at {breakpoint} leaves {} samples below and {} at or above, \
            but each segment needs at least {MIN_SAMPLES_PER_SEGMENT}",
            low.len(),
            high.len()
        )));
    }

    Ok((fit_segment(low)?, fit_segment(high)?))
}

fn fit_segment(samples: Vec<(f64, f64)>) -> Result<RegressionLine, UtilizationFactorError> {
    let (x, y): (Vec<f64>, Vec<f64>) = samples.into_iter().unzip();
    fit_line(&x, &y).map_err(UtilizationFactorError::Regression)
}

/// Weighted linear combination of two utilization factors.
///
/// The weights are used as given and are not normalised.
pub fn combine(uf_driver1: f64, uf_driver2: f64, weight1: f64, weight2: f64) -> f64 {
    weight1 * uf_driver1 + weight2 * uf_driver2
}

/// Weighted linear combination of any number of (utilization factor, weight) pairs.
///
/// A factor can be switched off by giving it a weight of zero; weights are not normalised.
pub fn combine_weighted(factors: &[(f64, f64)]) -> f64 {
    factors.iter().map(|(uf, weight)| weight * uf).sum()
}

/// Airmass and temperature utilization factors of one cell technology, with the weights
/// used to combine them.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UtilizationFactorModel {
    pub airmass: TwoSegmentFit,
    pub temperature: TwoSegmentFit,
    pub weight_airmass: f64,
    pub weight_temperature: f64,
}

impl UtilizationFactorModel {
    pub fn utilization_factor(&self, airmass: f64, temperature: f64) -> f64 {
        combine(
            self.airmass.evaluate(airmass),
            self.temperature.evaluate(temperature),
            self.weight_airmass,
            self.weight_temperature,
        )
    }

    /// Combined utilization factor for each timestep of paired airmass and temperature series.
    pub fn utilization_factor_series(
        &self,
        airmass: &[f64],
        temperature: &[f64],
    ) -> Result<Vec<f64>, UtilizationFactorError> {
        if airmass.len() != temperature.len() {
            return Err(UtilizationFactorError::MismatchedDriverSeries {
                airmass: airmass.len(),
                temperature: temperature.len(),
            });
        }

        Ok(airmass
            .iter()
            .zip(temperature)
            .map(|(airmass, temperature)| self.utilization_factor(*airmass, *temperature))
            .collect())
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum UtilizationFactorError {
    #[error("Insufficient data for a two-segment fit: {0}")]
    InsufficientData(String),
    #[error("No candidate breakpoint between {min} and {max} leaves at least two samples on each side")]
    NoFeasibleBreakpoint { min: f64, max: f64 },
    #[error("Fitted segments are parallel (slopes {slope_low} and {slope_high}), so they have no intersection to use as threshold")]
    DegenerateFit { slope_low: f64, slope_high: f64 },
    #[error("Invalid breakpoint search domain {0:?}: step must be positive and min must not exceed max")]
    InvalidSearchDomain(SearchDomain),
    #[error("Search domain {domain:?} has more than {limit} candidate breakpoints")]
    TooManyCandidates { domain: SearchDomain, limit: usize },
    #[error("Linear regression failed: {0}")]
    Regression(&'static str),
    #[error("Airmass series has {airmass} values but temperature series has {temperature}")]
    MismatchedDriverSeries { airmass: usize, temperature: usize },
}
