//! Analyzer library for service mesh anomaly detection
//!
//! This crate provides the core functionality for:
//! - In-memory time-series storage with optional retention
//! - Sliding-window feature extraction
//! - K-means baselines per entity
//! - Static and behavioral anomaly detection
//! - A polling monitor loop and observability

pub mod anomaly;
pub mod clustering;
pub mod config;
pub mod error;
pub mod features;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod pipeline;
pub mod stats;
pub mod timeseries;

pub use anomaly::{Anomaly, AnomalyType, Baseline, BaselineRegistry, Detector, SeverityLevel};
pub use clustering::{Cluster, ClusteringEngine, KMeansConfig};
pub use config::{AnalyzerConfig, DetectionConfig};
pub use error::{AnalyzerError, Result};
pub use features::FeatureExtractor;
pub use models::*;
pub use observability::{AnalyzerMetrics, StructuredLogger};
pub use pipeline::{Pipeline, PipelineConfig};
pub use timeseries::{RetentionPolicy, TimeSeriesStore};
