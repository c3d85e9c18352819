//! Core data models for the analyzer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of statistical features computed per window
pub const FEATURE_DIM: usize = 4;

/// Well-known metric series names recorded per service
pub mod metric_names {
    pub const REQUEST_COUNT: &str = "request_count";
    pub const TRAFFIC_RPS: &str = "traffic_rps";
    pub const ERROR_RATE: &str = "error_rate";
    /// Milliseconds
    pub const LATENCY_P99: &str = "latency_p99";
    pub const RETRY_COUNT: &str = "retry_count";
    pub const TIMEOUT_COUNT: &str = "timeout_count";
    pub const CIRCUIT_BREAKERS: &str = "circuit_breakers";
}

/// One timestamped observation of a metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            labels: HashMap::new(),
        }
    }

    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }
}

/// Raw reading handed over by a telemetry source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub entity: String,
    pub metric: String,
    pub value: f64,
    /// Observation time; the store stamps the arrival time when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// `[mean, stddev, trend, volatility]` summarizing one window of samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: [f64; FEATURE_DIM],
    /// Sample right after the window that triggered this vector
    #[serde(skip)]
    pub origin: Option<Sample>,
}

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_DIM]) -> Self {
        Self {
            values,
            origin: None,
        }
    }

    pub fn with_origin(values: [f64; FEATURE_DIM], origin: Sample) -> Self {
        Self {
            values,
            origin: Some(origin),
        }
    }

    pub fn mean(&self) -> f64 {
        self.values[0]
    }

    pub fn std_dev(&self) -> f64 {
        self.values[1]
    }

    pub fn trend(&self) -> f64 {
        self.values[2]
    }

    pub fn volatility(&self) -> f64 {
        self.values[3]
    }
}
