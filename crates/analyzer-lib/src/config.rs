//! Configuration values consumed by the analyzer core
//!
//! Only the values live here; loading them from files and the environment
//! is left to the binary.

use crate::clustering::KMeansConfig;
use crate::error::{AnalyzerError, Result};
use crate::features::DEFAULT_WINDOW_SIZE;
use crate::pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};

/// Thresholds for the static rules and the baseline distance check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Recent/prior traffic ratio that counts as a spike
    #[serde(default = "default_traffic_spike_threshold")]
    pub traffic_spike_threshold: f64,

    /// Error ratio (0..1) above which the latest sample is anomalous
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate_threshold: f64,

    /// p99 latency in milliseconds
    #[serde(default = "default_latency_threshold_ms")]
    pub latency_threshold_ms: f64,

    #[serde(default = "default_retry_threshold")]
    pub retry_threshold: f64,

    #[serde(default = "default_timeout_threshold")]
    pub timeout_threshold: f64,

    /// Tripped breakers tolerated before flagging
    #[serde(default)]
    pub circuit_breaker_threshold: f64,

    /// Samples per feature window; also the minimum for baseline learning
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Multiplier on the pooled baseline deviation
    #[serde(default = "default_sensitivity_level")]
    pub sensitivity_level: f64,
}

fn default_traffic_spike_threshold() -> f64 {
    2.0
}

fn default_error_rate_threshold() -> f64 {
    0.05
}

fn default_latency_threshold_ms() -> f64 {
    1000.0
}

fn default_retry_threshold() -> f64 {
    100.0
}

fn default_timeout_threshold() -> f64 {
    10.0
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_sensitivity_level() -> f64 {
    2.0
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            traffic_spike_threshold: default_traffic_spike_threshold(),
            error_rate_threshold: default_error_rate_threshold(),
            latency_threshold_ms: default_latency_threshold_ms(),
            retry_threshold: default_retry_threshold(),
            timeout_threshold: default_timeout_threshold(),
            circuit_breaker_threshold: 0.0,
            window_size: default_window_size(),
            sensitivity_level: default_sensitivity_level(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "detection.window_size must be at least 1".into(),
            ));
        }
        let thresholds = [
            ("traffic_spike_threshold", self.traffic_spike_threshold),
            ("error_rate_threshold", self.error_rate_threshold),
            ("latency_threshold_ms", self.latency_threshold_ms),
            ("retry_threshold", self.retry_threshold),
            ("timeout_threshold", self.timeout_threshold),
            ("circuit_breaker_threshold", self.circuit_breaker_threshold),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalyzerError::InvalidConfig(format!(
                    "detection.{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !self.sensitivity_level.is_finite() || self.sensitivity_level <= 0.0 {
            return Err(AnalyzerError::InvalidConfig(format!(
                "detection.sensitivity_level must be positive, got {}",
                self.sensitivity_level
            )));
        }
        Ok(())
    }
}

/// Complete analyzer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub clustering: KMeansConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        self.detection.validate()?;
        self.clustering.validate()?;
        self.pipeline.validate()?;

        // the behavioral check needs one full window plus the sample it scores
        if self.pipeline.lookback <= self.detection.window_size {
            return Err(AnalyzerError::InvalidConfig(format!(
                "pipeline.lookback ({}) must exceed detection.window_size ({})",
                self.pipeline.lookback, self.detection.window_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.detection.traffic_spike_threshold, 2.0);
        assert_eq!(config.detection.error_rate_threshold, 0.05);
        assert_eq!(config.detection.window_size, 10);
        assert_eq!(config.detection.sensitivity_level, 2.0);
        assert_eq!(config.clustering.k, 3);
        assert_eq!(config.clustering.max_iterations, 100);
        assert_eq!(config.clustering.tolerance, 0.01);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{"detection": {"window_size": 5}, "clustering": {"k": 2}}"#)
                .unwrap();
        assert_eq!(config.detection.window_size, 5);
        assert_eq!(config.detection.error_rate_threshold, 0.05);
        assert_eq!(config.clustering.k, 2);
        assert_eq!(config.clustering.max_iterations, 100);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AnalyzerConfig::default();
        config.detection.window_size = 0;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.detection.sensitivity_level = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.detection.error_rate_threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lookback_must_exceed_window() {
        let mut config = AnalyzerConfig::default();
        config.pipeline.lookback = config.detection.window_size;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidConfig(_)));
        assert!(err.to_string().contains("lookback"));

        config.pipeline.lookback = config.detection.window_size + 1;
        assert!(config.validate().is_ok());
    }
}
