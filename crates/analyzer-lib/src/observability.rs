//! Observability infrastructure for the analyzer
//!
//! Provides:
//! - Prometheus metrics (ingestion, baselines, anomalies by type, detection latency)
//! - Structured logging of pipeline events with tracing

use crate::anomaly::{Anomaly, SeverityLevel};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for detection latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
];

static GLOBAL_METRICS: OnceLock<AnalyzerMetricsInner> = OnceLock::new();

struct AnalyzerMetricsInner {
    samples_ingested: IntCounter,
    series_tracked: IntGauge,
    baselines_learned: IntCounter,
    baseline_failures: IntCounter,
    anomalies_detected: IntCounterVec,
    detection_latency_seconds: Histogram,
    source_errors: IntCounter,
}

impl AnalyzerMetricsInner {
    fn new() -> Self {
        Self {
            samples_ingested: register_int_counter!(
                "smanalyzer_samples_ingested_total",
                "Metric samples appended to the time-series store"
            )
            .expect("Failed to register samples_ingested"),

            series_tracked: register_int_gauge!(
                "smanalyzer_series_tracked",
                "Distinct entity/metric series held in memory"
            )
            .expect("Failed to register series_tracked"),

            baselines_learned: register_int_counter!(
                "smanalyzer_baselines_learned_total",
                "Baselines successfully learned or relearned"
            )
            .expect("Failed to register baselines_learned"),

            baseline_failures: register_int_counter!(
                "smanalyzer_baseline_failures_total",
                "Baseline learning attempts skipped for lack of data"
            )
            .expect("Failed to register baseline_failures"),

            anomalies_detected: register_int_counter_vec!(
                "smanalyzer_anomalies_detected_total",
                "Anomalies detected, by type",
                &["type"]
            )
            .expect("Failed to register anomalies_detected"),

            detection_latency_seconds: register_histogram!(
                "smanalyzer_detection_latency_seconds",
                "Time spent running detection for one entity",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register detection_latency_seconds"),

            source_errors: register_int_counter!(
                "smanalyzer_source_errors_total",
                "Failures reported by the telemetry source"
            )
            .expect("Failed to register source_errors"),
        }
    }
}

/// Handle to the process-wide analyzer metrics
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct AnalyzerMetrics {
    _private: (),
}

impl Default for AnalyzerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AnalyzerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AnalyzerMetricsInner {
        GLOBAL_METRICS.get_or_init(AnalyzerMetricsInner::new)
    }

    pub fn inc_samples_ingested(&self) {
        self.inner().samples_ingested.inc();
    }

    pub fn set_series_tracked(&self, count: usize) {
        self.inner().series_tracked.set(count as i64);
    }

    pub fn inc_baselines_learned(&self) {
        self.inner().baselines_learned.inc();
    }

    pub fn inc_baseline_failures(&self) {
        self.inner().baseline_failures.inc();
    }

    pub fn inc_anomalies_detected(&self, anomaly_type: &str) {
        self.inner()
            .anomalies_detected
            .with_label_values(&[anomaly_type])
            .inc();
    }

    pub fn observe_detection_latency(&self, duration_secs: f64) {
        self.inner().detection_latency_seconds.observe(duration_secs);
    }

    pub fn inc_source_errors(&self) {
        self.inner().source_errors.inc();
    }

    /// Prometheus text exposition of every registered metric
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for pipeline events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_anomaly(&self, anomaly: &Anomaly) {
        match anomaly.level() {
            SeverityLevel::Critical => {
                warn!(
                    event = "anomaly_detected",
                    instance = %self.instance,
                    entity = %anomaly.entity,
                    anomaly_type = %anomaly.anomaly_type,
                    severity = anomaly.severity,
                    level = %anomaly.level(),
                    details = %anomaly.description,
                    "Critical anomaly detected"
                );
            }
            _ => {
                info!(
                    event = "anomaly_detected",
                    instance = %self.instance,
                    entity = %anomaly.entity,
                    anomaly_type = %anomaly.anomaly_type,
                    severity = anomaly.severity,
                    level = %anomaly.level(),
                    details = %anomaly.description,
                    "Anomaly detected"
                );
            }
        }
    }

    pub fn log_baseline_learned(&self, entity: &str, clusters: usize, points: usize, threshold: f64) {
        info!(
            event = "baseline_learned",
            instance = %self.instance,
            entity = %entity,
            clusters = clusters,
            points = points,
            threshold = threshold,
            "Baseline learned"
        );
    }

    /// Learning was skipped; the entity will be retried on a later cycle
    pub fn log_baseline_skipped(&self, entity: &str, reason: &str) {
        info!(
            event = "baseline_skipped",
            instance = %self.instance,
            entity = %entity,
            reason = %reason,
            "Skipping baseline for now"
        );
    }

    pub fn log_cycle_complete(
        &self,
        mode: &str,
        entities: usize,
        samples: usize,
        anomalies: usize,
        errors: usize,
    ) {
        info!(
            event = "cycle_complete",
            instance = %self.instance,
            mode = %mode,
            entities = entities,
            samples = samples,
            anomalies = anomalies,
            errors = errors,
            "Analysis cycle complete"
        );
    }

    pub fn log_monitor_start(&self, mode: &str, interval_secs: u64) {
        info!(
            event = "monitor_started",
            instance = %self.instance,
            mode = %mode,
            interval_secs = interval_secs,
            "Monitor loop started"
        );
    }

    pub fn log_monitor_stop(&self, cycles: u64) {
        info!(
            event = "monitor_stopped",
            instance = %self.instance,
            cycles = cycles,
            "Monitor loop stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_render_includes_counters() {
        let metrics = AnalyzerMetrics::new();
        metrics.inc_samples_ingested();
        metrics.set_series_tracked(3);
        metrics.inc_anomalies_detected("traffic_spike");
        metrics.observe_detection_latency(0.0001);

        let text = metrics.render();
        assert!(text.contains("smanalyzer_samples_ingested_total"));
        assert!(text.contains("smanalyzer_anomalies_detected_total{type=\"traffic_spike\"}"));
    }

    #[test]
    fn test_handles_share_global_metrics() {
        let a = AnalyzerMetrics::new();
        let b = a.clone();
        a.inc_source_errors();
        b.inc_source_errors();
        assert!(AnalyzerMetrics::default()
            .render()
            .contains("smanalyzer_source_errors_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance, "test-instance");
    }
}
