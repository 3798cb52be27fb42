/// A simple statistics module with the few aggregates the regression and demand code need.
use statrs::statistics::Statistics;

/// Arithmetic mean; `NaN` for an empty slice.
pub fn mean(numbers: &[f64]) -> f64 {
    numbers.iter().mean()
}

/// Root-mean-square deviation between actual and predicted values.
///
/// Both slices are expected to have the same length; `NaN` for empty input.
pub fn root_mean_square_deviation(actual: &[f64], predicted: &[f64]) -> f64 {
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .mean()
        .sqrt()
}
