//! Numeric helpers shared by feature extraction, clustering and detection
//!
//! Every helper returns a finite fallback (0.0) instead of dividing by zero.

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (Bessel's correction), 0 when fewer than two values
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let mean = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Relative change from the first to the last value
///
/// Returns 0 when fewer than two values exist or when the first value is zero.
pub fn trend(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let first = values[0];
    let last = values[values.len() - 1];
    ratio_or(last - first, first, 0.0)
}

/// Sample standard deviation of consecutive relative changes
///
/// A change whose previous value is zero counts as 0. Returns 0 when fewer
/// than two changes exist.
pub fn volatility(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let changes: Vec<f64> = values
        .windows(2)
        .map(|pair| ratio_or(pair[1] - pair[0], pair[0], 0.0))
        .collect();
    std_dev(&changes)
}

/// Plain Euclidean distance; extra dimensions on the longer side are ignored
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// `numerator / denominator`, or `fallback` when the division is undefined
pub fn ratio_or(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator == 0.0 {
        return fallback;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert!((mean(&[10.0, 20.0, 30.0]) - 20.0).abs() < 1e-9);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_std_dev_sample_denominator() {
        let sd = std_dev(&[10.0, 12.0, 14.0, 16.0, 18.0]);
        assert!(sd > 0.0);
        assert!(sd <= 10.0);
        // sum of squares 40 over n-1 = 4
        assert!((sd - 10.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_std_dev_small_inputs() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[42.0]), 0.0);
    }

    #[test]
    fn test_trend() {
        assert!((trend(&[10.0, 15.0, 20.0]) - 1.0).abs() < 1e-9);
        assert!((trend(&[20.0, 10.0]) + 0.5).abs() < 1e-9);
        assert_eq!(trend(&[5.0]), 0.0);
    }

    #[test]
    fn test_trend_zero_first_value() {
        assert_eq!(trend(&[0.0, 5.0, 10.0]), 0.0);
    }

    #[test]
    fn test_volatility() {
        assert!(volatility(&[100.0, 105.0, 95.0, 110.0]) > 0.0);
        assert_eq!(volatility(&[100.0, 110.0]), 0.0);
        assert_eq!(volatility(&[7.0, 7.0, 7.0, 7.0]), 0.0);
    }

    #[test]
    fn test_volatility_skips_zero_denominators() {
        let v = volatility(&[0.0, 10.0, 20.0, 10.0]);
        assert!(v.is_finite());
        assert!(v > 0.0);
    }

    #[test]
    fn test_euclidean_distance() {
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-9);
        assert_eq!(euclidean_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_ratio_or() {
        assert_eq!(ratio_or(5.0, 0.0, 1.0), 1.0);
        assert!((ratio_or(250.0, 100.0, 1.0) - 2.5).abs() < 1e-9);
    }
}
