use super::baseline::{Baseline, BaselineRegistry};
use super::rules::StaticRule;
use super::types::{Anomaly, AnomalyType};
use crate::clustering::ClusteringEngine;
use crate::config::DetectionConfig;
use crate::error::{AnalyzerError, Result};
use crate::features::FeatureExtractor;
use crate::models::{metric_names, Sample};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Shortest series `detect_static` evaluates
pub const MIN_STATIC_POINTS: usize = 2;

/// Recent samples of every metric known for one entity
#[derive(Debug, Clone)]
pub struct ServiceWindow {
    /// Series used for traffic spikes and the behavioral check
    pub traffic_metric: String,
    pub series: HashMap<String, Vec<Sample>>,
}

impl ServiceWindow {
    pub fn new(traffic_metric: impl Into<String>) -> Self {
        Self {
            traffic_metric: traffic_metric.into(),
            series: HashMap::new(),
        }
    }

    pub fn insert(&mut self, metric: impl Into<String>, samples: Vec<Sample>) {
        self.series.insert(metric.into(), samples);
    }

    pub fn with_series(mut self, metric: impl Into<String>, samples: Vec<Sample>) -> Self {
        self.insert(metric, samples);
        self
    }

    /// Samples for `metric`, empty when the entity never reported it
    pub fn get(&self, metric: &str) -> &[Sample] {
        self.series.get(metric).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn traffic(&self) -> &[Sample] {
        self.get(&self.traffic_metric)
    }
}

impl Default for ServiceWindow {
    fn default() -> Self {
        Self::new(metric_names::REQUEST_COUNT)
    }
}

/// Static rules plus the baseline distance check
///
/// Safe to share across threads: learning swaps whole baselines and
/// detection works on whichever baseline was current when it started.
#[derive(Debug)]
pub struct Detector {
    config: DetectionConfig,
    engine: ClusteringEngine,
    extractor: FeatureExtractor,
    baselines: BaselineRegistry,
}

impl Detector {
    pub fn new(config: DetectionConfig, engine: ClusteringEngine) -> Self {
        let extractor = FeatureExtractor::new(config.window_size);
        Self {
            config,
            engine,
            extractor,
            baselines: BaselineRegistry::new(),
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn baselines(&self) -> &BaselineRegistry {
        &self.baselines
    }

    pub fn baseline(&self, entity: &str) -> Option<Arc<Baseline>> {
        self.baselines.get(entity)
    }

    /// Cluster the features of `points` and make them the entity's baseline
    ///
    /// Any previous baseline is replaced outright. On error the registry is
    /// left untouched.
    pub fn learn_baseline(&self, entity: &str, points: &[Sample]) -> Result<Arc<Baseline>> {
        let required = self.config.window_size;
        if points.len() < required {
            return Err(AnalyzerError::InsufficientData {
                required,
                available: points.len(),
            });
        }

        let features = self.extractor.extract(points);
        let clusters = self.engine.fit(&features)?;
        let baseline = Arc::new(Baseline::new(
            entity,
            clusters,
            self.config.sensitivity_level,
        ));

        info!(
            entity = %entity,
            samples = points.len(),
            features = features.len(),
            clusters = baseline.clusters.len(),
            threshold = baseline.threshold(),
            "Learned baseline"
        );

        self.baselines.insert(Arc::clone(&baseline));
        Ok(baseline)
    }

    /// Traffic spike and error rate on `points`, then the behavioral check
    pub fn detect_anomalies(&self, entity: &str, points: &[Sample]) -> Vec<Anomaly> {
        let mut anomalies = self.detect_static(entity, points);
        anomalies.extend(self.detect_behavioral(entity, points));
        anomalies
    }

    /// Traffic spike and error rate on one series; needs at least
    /// `MIN_STATIC_POINTS` samples
    pub fn detect_static(&self, entity: &str, points: &[Sample]) -> Vec<Anomaly> {
        if points.len() < MIN_STATIC_POINTS {
            return Vec::new();
        }
        [StaticRule::TrafficSpike, StaticRule::ErrorRate]
            .iter()
            .filter_map(|rule| rule.evaluate(entity, points, &self.config))
            .collect()
    }

    /// Distance of the latest feature vector from the learned clusters
    ///
    /// `None` when the entity has no baseline or `points` is shorter than a
    /// full window plus one.
    pub fn detect_behavioral(&self, entity: &str, points: &[Sample]) -> Option<Anomaly> {
        let baseline = self.baselines.get(entity)?;
        let latest = self.extractor.extract_latest(points)?;
        let distance = baseline.nearest_distance(&latest.values)?;
        let threshold = baseline.dynamic_threshold(self.config.sensitivity_level);

        debug!(
            entity = %entity,
            distance,
            threshold,
            "Behavioral check"
        );

        if distance <= threshold {
            return None;
        }

        let origin = latest.origin.as_ref();
        let timestamp = origin.map(|s| s.timestamp).unwrap_or_else(Utc::now);
        let mut anomaly = Anomaly::new(
            AnomalyType::BehavioralAnomaly,
            entity,
            baseline.severity(distance, self.config.sensitivity_level),
            format!("Behavioral anomaly detected (distance: {:.2})", distance),
            timestamp,
        )
        .with_metric("anomaly_distance", distance)
        .with_metric("threshold", threshold);
        if let Some(sample) = origin {
            anomaly = anomaly
                .with_metric("current_value", sample.value)
                .with_labels(&sample.labels);
        }
        Some(anomaly)
    }

    /// Every static rule against its own series, then the behavioral check
    /// on the traffic series
    pub fn detect_service(&self, entity: &str, window: &ServiceWindow) -> Vec<Anomaly> {
        let mut anomalies: Vec<Anomaly> = StaticRule::ALL
            .iter()
            .filter_map(|rule| {
                let points = match rule.metric() {
                    Some(metric) => window.get(metric),
                    None => window.traffic(),
                };
                rule.evaluate(entity, points, &self.config)
            })
            .collect();
        anomalies.extend(self.detect_behavioral(entity, window.traffic()));
        anomalies
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(DetectionConfig::default(), ClusteringEngine::default())
    }
}
