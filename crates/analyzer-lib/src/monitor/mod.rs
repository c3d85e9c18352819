//! Polling loop that feeds telemetry into the pipeline
//!
//! A [`MetricsSource`] reports which entities exist and hands over their
//! newest readings; the [`MonitorLoop`] ingests them on a fixed interval
//! and either learns baselines or detects anomalies.

mod r#loop;


pub use r#loop::{CycleReport, MonitorConfig, MonitorLoop, PipelineMode};

use crate::models::MetricReading;
use anyhow::Result;

pub use async_trait::async_trait;

/// Trait for telemetry source implementations
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Entities currently reporting metrics
    async fn discover(&self) -> Result<Vec<String>>;

    /// Readings for one entity that arrived since the previous call
    async fn collect(&self, entity: &str) -> Result<Vec<MetricReading>>;
}
