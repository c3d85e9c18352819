//! Fixed-interval monitor loop
//!
//! Each cycle discovers entities, collects and ingests their readings, then
//! runs the pipeline in the configured mode.

use super::MetricsSource;
use crate::anomaly::Anomaly;
use crate::observability::{AnalyzerMetrics, StructuredLogger};
use crate::pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Instant};
use tracing::{debug, info, warn};

/// What the loop does with freshly ingested data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Relearn baselines every cycle
    Learn,
    /// Run detection every cycle
    Detect,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Learn => "learn",
            PipelineMode::Detect => "detect",
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "learn" => Ok(PipelineMode::Learn),
            "detect" => Ok(PipelineMode::Detect),
            other => Err(format!("unknown mode '{}', expected learn or detect", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between cycles (default: 10 seconds)
    pub interval: Duration,
    pub mode: PipelineMode,
    /// Anomaly channel buffer size
    pub buffer_size: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            mode: PipelineMode::Detect,
            buffer_size: 1000,
        }
    }
}

/// Counters for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub entities: usize,
    pub samples: usize,
    pub baselines_learned: usize,
    pub baselines_skipped: usize,
    pub anomalies: usize,
    pub errors: usize,
}

pub struct MonitorLoop {
    source: Arc<dyn MetricsSource>,
    pipeline: Arc<Pipeline>,
    config: MonitorConfig,
    anomaly_tx: mpsc::Sender<Anomaly>,
    metrics: AnalyzerMetrics,
    logger: StructuredLogger,
    cycles: u64,
}

impl MonitorLoop {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        pipeline: Arc<Pipeline>,
        config: MonitorConfig,
    ) -> (Self, mpsc::Receiver<Anomaly>) {
        let (anomaly_tx, anomaly_rx) = mpsc::channel(config.buffer_size.max(1));

        let monitor = Self {
            source,
            pipeline,
            config,
            anomaly_tx,
            metrics: AnalyzerMetrics::new(),
            logger: StructuredLogger::new("monitor"),
            cycles: 0,
        };

        (monitor, anomaly_rx)
    }

    pub fn mode(&self) -> PipelineMode {
        self.config.mode
    }

    pub fn set_mode(&mut self, mode: PipelineMode) {
        if mode != self.config.mode {
            info!(from = %self.config.mode, to = %mode, "Switching monitor mode");
            self.config.mode = mode;
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run until `shutdown` fires; returns the number of completed cycles
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        self.logger
            .log_monitor_start(self.config.mode.as_str(), self.config.interval.as_secs());

        let mut ticker = interval(self.config.interval.max(Duration::from_millis(1)));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();
                    let report = self.tick().await;
                    debug!(
                        elapsed_ms = start.elapsed().as_millis(),
                        entities = report.entities,
                        "Monitor cycle finished"
                    );
                }
                _ = shutdown.recv() => {
                    info!("Shutting down monitor loop");
                    break;
                }
            }
        }

        self.logger.log_monitor_stop(self.cycles);
        self.cycles
    }

    /// One discover, collect, ingest and analyze pass
    pub async fn tick(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        self.cycles += 1;

        let entities = match self.source.discover().await {
            Ok(entities) => entities,
            Err(e) => {
                warn!(error = %e, "Failed to discover entities");
                self.metrics.inc_source_errors();
                report.errors += 1;
                self.log_report(&report);
                return report;
            }
        };
        report.entities = entities.len();

        for entity in &entities {
            match self.source.collect(entity).await {
                Ok(readings) => {
                    report.samples += self.pipeline.ingest_all(readings);
                }
                Err(e) => {
                    report.errors += 1;
                    self.metrics.inc_source_errors();
                    debug!(
                        entity = %entity,
                        error = %e,
                        "Failed to collect readings"
                    );
                }
            }
        }

        match self.config.mode {
            PipelineMode::Learn => self.learn(&entities, &mut report),
            PipelineMode::Detect => self.detect(&entities, &mut report).await,
        }

        self.log_report(&report);
        report
    }

    fn learn(&self, entities: &[String], report: &mut CycleReport) {
        for entity in entities {
            match self.pipeline.learn(entity) {
                Ok(_) => report.baselines_learned += 1,
                Err(e) if e.is_recoverable() => report.baselines_skipped += 1,
                Err(e) => {
                    report.errors += 1;
                    warn!(entity = %entity, error = %e, "Baseline learning failed");
                }
            }
        }
    }

    async fn detect(&self, entities: &[String], report: &mut CycleReport) {
        for entity in entities {
            for anomaly in self.pipeline.scan(entity) {
                report.anomalies += 1;
                if let Err(e) = self.anomaly_tx.send(anomaly).await {
                    warn!(error = %e, "Failed to send anomaly to channel");
                }
            }
        }
    }

    fn log_report(&self, report: &CycleReport) {
        self.logger.log_cycle_complete(
            self.config.mode.as_str(),
            report.entities,
            report.samples,
            report.anomalies,
            report.errors,
        );
    }
}
