//! Store -> features -> baselines -> anomalies, wired together
//!
//! The pipeline owns no scheduling. Callers (the monitor loop, the CLI)
//! decide when to ingest, learn and scan.

use crate::anomaly::{Anomaly, Baseline, Detector, ServiceWindow};
use crate::clustering::ClusteringEngine;
use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, Result};
use crate::models::{metric_names, MetricReading};
use crate::observability::{AnalyzerMetrics, StructuredLogger};
use crate::timeseries::{RetentionPolicy, TimeSeriesStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Metric used for traffic spikes, learning and the behavioral check
    #[serde(default = "default_traffic_metric")]
    pub traffic_metric: String,

    /// Most recent samples per series handed to detection
    #[serde(default = "default_lookback")]
    pub lookback: usize,

    #[serde(default)]
    pub retention: RetentionPolicy,
}

fn default_traffic_metric() -> String {
    metric_names::REQUEST_COUNT.to_string()
}

fn default_lookback() -> usize {
    50
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            traffic_metric: default_traffic_metric(),
            lookback: default_lookback(),
            retention: RetentionPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.traffic_metric.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfig(
                "pipeline.traffic_metric must not be empty".into(),
            ));
        }
        if self.lookback == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "pipeline.lookback must be at least 1".into(),
            ));
        }
        if self.retention.max_points == Some(0) {
            return Err(AnalyzerError::InvalidConfig(
                "pipeline.retention.max_points must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of learning every known entity
#[derive(Debug, Clone, Default)]
pub struct LearnSummary {
    pub learned: Vec<Arc<Baseline>>,
    /// Entity and the reason it was skipped
    pub skipped: Vec<(String, String)>,
}

pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<TimeSeriesStore>,
    detector: Arc<Detector>,
    metrics: AnalyzerMetrics,
    logger: StructuredLogger,
}

impl Pipeline {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let store = Arc::new(TimeSeriesStore::with_retention(
            config.pipeline.retention.clone(),
        ));
        Self::with_store(config, store)
    }

    /// Build around an existing store
    pub fn with_store(config: &AnalyzerConfig, store: Arc<TimeSeriesStore>) -> Result<Self> {
        config.validate()?;
        let detector = Detector::new(
            config.detection.clone(),
            ClusteringEngine::new(config.clustering.clone()),
        );
        Ok(Self {
            config: config.pipeline.clone(),
            store,
            detector: Arc::new(detector),
            metrics: AnalyzerMetrics::new(),
            logger: StructuredLogger::new("pipeline"),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TimeSeriesStore> {
        &self.store
    }

    pub fn detector(&self) -> &Arc<Detector> {
        &self.detector
    }

    pub fn ingest(&self, reading: MetricReading) {
        let timestamp = reading.timestamp.unwrap_or_else(Utc::now);
        self.store.append_at(
            &reading.entity,
            &reading.metric,
            timestamp,
            reading.value,
            reading.labels,
        );
        self.metrics.inc_samples_ingested();
    }

    /// Ingest a batch; returns the number of readings appended
    pub fn ingest_all(&self, readings: impl IntoIterator<Item = MetricReading>) -> usize {
        let mut count = 0;
        for reading in readings {
            self.ingest(reading);
            count += 1;
        }
        self.metrics.set_series_tracked(self.store.series_count());
        count
    }

    /// Learn a baseline from the entity's full traffic series
    pub fn learn(&self, entity: &str) -> Result<Arc<Baseline>> {
        let points = self
            .store
            .get(entity, &self.config.traffic_metric)
            .map(|series| series.points)
            .unwrap_or_default();

        match self.detector.learn_baseline(entity, &points) {
            Ok(baseline) => {
                self.metrics.inc_baselines_learned();
                self.logger.log_baseline_learned(
                    entity,
                    baseline.clusters.len(),
                    baseline.total_points(),
                    baseline.threshold(),
                );
                Ok(baseline)
            }
            Err(e) => {
                if e.is_recoverable() {
                    self.metrics.inc_baseline_failures();
                    self.logger.log_baseline_skipped(entity, &e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Learn every entity, collecting skips instead of failing
    pub fn learn_all(&self) -> Result<LearnSummary> {
        let mut summary = LearnSummary::default();
        for entity in self.store.entities() {
            match self.learn(&entity) {
                Ok(baseline) => summary.learned.push(baseline),
                Err(e) if e.is_recoverable() => summary.skipped.push((entity, e.to_string())),
                Err(e) => return Err(e),
            }
        }
        Ok(summary)
    }

    /// Latest `lookback` samples of every metric the entity reports
    pub fn service_window(&self, entity: &str) -> ServiceWindow {
        let mut window = ServiceWindow::new(self.config.traffic_metric.clone());
        for metric in self.store.metrics_for(entity) {
            let points = self.store.latest_n(entity, &metric, self.config.lookback);
            window.insert(metric, points);
        }
        window
    }

    pub fn scan(&self, entity: &str) -> Vec<Anomaly> {
        let started = Instant::now();
        let window = self.service_window(entity);
        let anomalies = self.detector.detect_service(entity, &window);
        self.metrics
            .observe_detection_latency(started.elapsed().as_secs_f64());

        for anomaly in &anomalies {
            self.metrics
                .inc_anomalies_detected(anomaly.anomaly_type.as_str());
            self.logger.log_anomaly(anomaly);
        }
        anomalies
    }

    /// Scan every entity in sorted order
    pub fn scan_all(&self) -> Vec<Anomaly> {
        self.store
            .entities()
            .iter()
            .flat_map(|entity| self.scan(entity))
            .collect()
    }
}
