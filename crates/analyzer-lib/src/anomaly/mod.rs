//! Anomaly detection for service mesh metrics
//!
//! This module provides:
//! - Static threshold rules (traffic spikes, error rate, latency, retries,
//!   timeouts, circuit breakers)
//! - Per-entity baselines learned with K-means
//! - Behavioral detection against those baselines

mod baseline;
mod detector;
mod rules;
mod types;

#[cfg(test)]
mod tests;

pub use baseline::{read_snapshot, Baseline, BaselineRegistry, BaselineSnapshot, SNAPSHOT_VERSION};
pub use detector::{Detector, ServiceWindow, MIN_STATIC_POINTS};
pub use rules::{StaticRule, RECENT_WINDOW};
pub use types::{Anomaly, AnomalyType, SeverityLevel};
