//! Static threshold rules
//!
//! Each rule looks at the tail of one metric series and needs no baseline.
//! Severity is always the observed value's ratio to what the rule expected.

use super::types::{Anomaly, AnomalyType};
use crate::config::DetectionConfig;
use crate::models::{metric_names, Sample};
use crate::stats::{mean, ratio_or};

/// Number of most recent samples compared against the prior mean
pub const RECENT_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticRule {
    TrafficSpike,
    ErrorRate,
    Latency,
    RetryStorm,
    Timeout,
    CircuitBreaker,
}

impl StaticRule {
    /// Evaluation order used by metric-routed detection
    pub const ALL: [StaticRule; 6] = [
        StaticRule::TrafficSpike,
        StaticRule::ErrorRate,
        StaticRule::Latency,
        StaticRule::RetryStorm,
        StaticRule::Timeout,
        StaticRule::CircuitBreaker,
    ];

    pub fn anomaly_type(&self) -> AnomalyType {
        match self {
            StaticRule::TrafficSpike => AnomalyType::TrafficSpike,
            StaticRule::ErrorRate => AnomalyType::ErrorRateHigh,
            StaticRule::Latency => AnomalyType::LatencyAnomaly,
            StaticRule::RetryStorm => AnomalyType::RetryStorm,
            StaticRule::Timeout => AnomalyType::TimeoutAnomaly,
            StaticRule::CircuitBreaker => AnomalyType::CircuitBreaker,
        }
    }

    /// Series the rule reads; `None` means the configured traffic metric
    pub fn metric(&self) -> Option<&'static str> {
        match self {
            StaticRule::TrafficSpike => None,
            StaticRule::ErrorRate => Some(metric_names::ERROR_RATE),
            StaticRule::Latency => Some(metric_names::LATENCY_P99),
            StaticRule::RetryStorm => Some(metric_names::RETRY_COUNT),
            StaticRule::Timeout => Some(metric_names::TIMEOUT_COUNT),
            StaticRule::CircuitBreaker => Some(metric_names::CIRCUIT_BREAKERS),
        }
    }

    pub fn evaluate(
        &self,
        entity: &str,
        points: &[Sample],
        config: &DetectionConfig,
    ) -> Option<Anomaly> {
        match self {
            StaticRule::TrafficSpike => traffic_spike(entity, points, config.traffic_spike_threshold),
            StaticRule::ErrorRate => {
                let latest = points.last()?;
                exceeds(latest, config.error_rate_threshold).then(|| {
                    threshold_anomaly(
                        *self,
                        entity,
                        latest,
                        config.error_rate_threshold,
                        format!("High error rate: {:.2}%", latest.value * 100.0),
                        metric_names::ERROR_RATE,
                    )
                })
            }
            StaticRule::Latency => {
                let latest = points.last()?;
                exceeds(latest, config.latency_threshold_ms).then(|| {
                    threshold_anomaly(
                        *self,
                        entity,
                        latest,
                        config.latency_threshold_ms,
                        format!(
                            "High p99 latency: {:.0}ms (threshold {:.0}ms)",
                            latest.value, config.latency_threshold_ms
                        ),
                        "latency_p99_ms",
                    )
                })
            }
            StaticRule::RetryStorm => {
                let latest = points.last()?;
                exceeds(latest, config.retry_threshold).then(|| {
                    threshold_anomaly(
                        *self,
                        entity,
                        latest,
                        config.retry_threshold,
                        format!("Retry storm: {:.0} retries", latest.value),
                        metric_names::RETRY_COUNT,
                    )
                })
            }
            StaticRule::Timeout => {
                let latest = points.last()?;
                exceeds(latest, config.timeout_threshold).then(|| {
                    threshold_anomaly(
                        *self,
                        entity,
                        latest,
                        config.timeout_threshold,
                        format!("Request timeouts: {:.0}", latest.value),
                        metric_names::TIMEOUT_COUNT,
                    )
                })
            }
            StaticRule::CircuitBreaker => {
                let latest = points.last()?;
                exceeds(latest, config.circuit_breaker_threshold).then(|| {
                    threshold_anomaly(
                        *self,
                        entity,
                        latest,
                        config.circuit_breaker_threshold,
                        format!("Circuit breaker tripped: {:.0} open", latest.value),
                        metric_names::CIRCUIT_BREAKERS,
                    )
                })
            }
        }
    }
}

fn exceeds(latest: &Sample, threshold: f64) -> bool {
    latest.value > threshold
}

/// Mean of the last three samples against the mean of everything before them
///
/// With exactly three samples the prior mean is 0, so any positive traffic
/// fires at severity 1.0.
fn traffic_spike(entity: &str, points: &[Sample], threshold: f64) -> Option<Anomaly> {
    if points.len() < RECENT_WINDOW {
        return None;
    }
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let split = values.len() - RECENT_WINDOW;
    let prior_mean = mean(&values[..split]);
    let recent_mean = mean(&values[split..]);

    if recent_mean <= prior_mean * threshold {
        return None;
    }

    let latest = points.last()?;
    let severity = ratio_or(recent_mean, prior_mean, 1.0);
    Some(
        Anomaly::new(
            AnomalyType::TrafficSpike,
            entity,
            severity,
            format!(
                "Traffic spike detected: {:.2} requests (recent mean {:.2}, prior mean {:.2})",
                latest.value, recent_mean, prior_mean
            ),
            latest.timestamp,
        )
        .with_metric("current_traffic", latest.value)
        .with_metric("recent_mean", recent_mean)
        .with_metric("prior_mean", prior_mean)
        .with_labels(&latest.labels),
    )
}

fn threshold_anomaly(
    rule: StaticRule,
    entity: &str,
    latest: &Sample,
    threshold: f64,
    description: String,
    metric_key: &str,
) -> Anomaly {
    Anomaly::new(
        rule.anomaly_type(),
        entity,
        ratio_or(latest.value, threshold, 1.0),
        description,
        latest.timestamp,
    )
    .with_metric(metric_key, latest.value)
    .with_metric("threshold", threshold)
    .with_labels(&latest.labels)
}
