//! Anomaly records emitted by the detector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Closed set of anomaly classifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    TrafficSpike,
    ErrorRateHigh,
    LatencyAnomaly,
    CircuitBreaker,
    RetryStorm,
    TimeoutAnomaly,
    BehavioralAnomaly,
}

impl AnomalyType {
    pub const ALL: [AnomalyType; 7] = [
        AnomalyType::TrafficSpike,
        AnomalyType::ErrorRateHigh,
        AnomalyType::LatencyAnomaly,
        AnomalyType::CircuitBreaker,
        AnomalyType::RetryStorm,
        AnomalyType::TimeoutAnomaly,
        AnomalyType::BehavioralAnomaly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::TrafficSpike => "traffic_spike",
            AnomalyType::ErrorRateHigh => "error_rate_high",
            AnomalyType::LatencyAnomaly => "latency_anomaly",
            AnomalyType::CircuitBreaker => "circuit_breaker",
            AnomalyType::RetryStorm => "retry_storm",
            AnomalyType::TimeoutAnomaly => "timeout_anomaly",
            AnomalyType::BehavioralAnomaly => "behavioral_anomaly",
        }
    }
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse bucket of a severity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 3.0 {
            SeverityLevel::Critical
        } else if score >= 2.0 {
            SeverityLevel::High
        } else if score >= 1.5 {
            SeverityLevel::Medium
        } else {
            SeverityLevel::Low
        }
    }
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeverityLevel::Low => write!(f, "LOW"),
            SeverityLevel::Medium => write!(f, "MEDIUM"),
            SeverityLevel::High => write!(f, "HIGH"),
            SeverityLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A detected deviation for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub entity: String,
    /// Unitless ratio, higher is more anomalous
    pub severity: f64,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl Anomaly {
    pub(crate) fn new(
        anomaly_type: AnomalyType,
        entity: &str,
        severity: f64,
        description: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            anomaly_type,
            entity: entity.to_string(),
            severity: if severity.is_finite() { severity.max(0.0) } else { 0.0 },
            description,
            timestamp,
            metrics: BTreeMap::new(),
            labels: BTreeMap::new(),
        }
    }

    pub(crate) fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub(crate) fn with_labels(mut self, labels: &HashMap<String, String>) -> Self {
        self.labels = labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self
    }

    pub fn level(&self) -> SeverityLevel {
        SeverityLevel::from_score(self.severity)
    }
}
