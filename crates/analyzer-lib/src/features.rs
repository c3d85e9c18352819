//! Sliding-window feature extraction
//!
//! Turns a run of raw samples into `[mean, stddev, trend, volatility]`
//! vectors, one per sample that has a full window of history before it.

use crate::models::{FeatureVector, Sample, FEATURE_DIM};
use crate::stats;

/// Default number of samples per window
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Extracts statistical feature vectors over sliding windows
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    window_size: usize,
}

impl FeatureExtractor {
    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Whether `points` yields at least one feature vector
    pub fn has_sufficient_data(&self, points: &[Sample]) -> bool {
        self.window_size > 0 && points.len() > self.window_size
    }

    /// Number of vectors `extract` produces for `len` points
    pub fn output_len(&self, len: usize) -> usize {
        if self.window_size == 0 {
            return 0;
        }
        len.saturating_sub(self.window_size)
    }

    /// One vector per index `i >= window_size`, computed over the
    /// `window_size` points before `i` and tagged with `points[i]`
    pub fn extract(&self, points: &[Sample]) -> Vec<FeatureVector> {
        if self.window_size == 0 {
            return Vec::new();
        }
        (self.window_size..points.len())
            .map(|i| {
                let window = &points[i - self.window_size..i];
                FeatureVector::with_origin(window_features(window), points[i].clone())
            })
            .collect()
    }

    /// Features of the most recent full window, if any
    pub fn extract_latest(&self, points: &[Sample]) -> Option<FeatureVector> {
        if !self.has_sufficient_data(points) {
            return None;
        }
        let last = points.len() - 1;
        let window = &points[last - self.window_size..last];
        Some(FeatureVector::with_origin(
            window_features(window),
            points[last].clone(),
        ))
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

/// Statistics for one window of samples
pub fn window_features(window: &[Sample]) -> [f64; FEATURE_DIM] {
    let values: Vec<f64> = window.iter().map(|s| s.value).collect();
    [
        stats::mean(&values),
        stats::std_dev(&values),
        stats::trend(&values),
        stats::volatility(&values),
    ]
}
