//! Descriptive statistics over window samples.

use statrs::statistics::Statistics;

/// Mean, population standard deviation, minimum and maximum of a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// Summarize a non-empty slice. Empty input yields NaN fields.
    pub fn of(values: &[f64]) -> Self {
        Self {
            mean: Statistics::mean(values),
            std: Statistics::population_std_dev(values),
            min: Statistics::min(values),
            max: Statistics::max(values),
        }
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std_dev(values: &[f64]) -> f64 {
    Statistics::std_dev(values)
}

/// Least-squares slope of `values` against their index `0..len`.
///
/// Fewer than two points carry no trend and give 0.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = Statistics::mean(values);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }

    sxy / sxx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_constant() {
        let summary = Summary::of(&[30.0; 240]);
        assert_eq!(summary.mean, 30.0);
        assert_eq!(summary.std, 0.0);
        assert_eq!(summary.min, 30.0);
        assert_eq!(summary.max, 30.0);
    }

    #[test]
    fn test_population_vs_sample_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let summary = Summary::of(&values);
        assert!((summary.std - 2.0).abs() < 1e-12);
        assert!((sample_std_dev(&values) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
    }

    #[test]
    fn test_slope_of_ramp() {
        let ramp: Vec<f64> = (0..240).map(|i| 0.0125 * i as f64 + 31.5).collect();
        assert!((linear_slope(&ramp) - 0.0125).abs() < 1e-12);

        let falling: Vec<f64> = (0..10).map(|i| 5.0 - 2.0 * i as f64).collect();
        assert!((linear_slope(&falling) + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_slope_degenerate() {
        assert_eq!(linear_slope(&[]), 0.0);
        assert_eq!(linear_slope(&[3.0]), 0.0);
        assert_eq!(linear_slope(&[1.0, 1.0, 1.0]), 0.0);
    }
}
