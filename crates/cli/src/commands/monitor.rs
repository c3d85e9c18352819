//! Continuous monitoring of a growing readings file

use super::{load_baselines, save_baselines};
use crate::output::{color_severity, print_info, OutputFormat};
use crate::source::ReplaySource;
use analyzer_lib::monitor::{MonitorConfig, MonitorLoop, PipelineMode};
use analyzer_lib::{AnalyzerConfig, AnalyzerMetrics, Anomaly, Pipeline};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

pub struct MonitorOptions<'a> {
    pub input: &'a Path,
    pub interval: Duration,
    pub mode: PipelineMode,
    /// Baseline snapshot: loaded at start, written on exit in learn mode
    pub model: Option<&'a Path>,
    /// Stop after this many cycles instead of waiting for Ctrl-C
    pub max_cycles: Option<u64>,
    pub dump_metrics: bool,
}

pub async fn monitor(
    config: &AnalyzerConfig,
    options: MonitorOptions<'_>,
    format: OutputFormat,
) -> Result<()> {
    let pipeline = Arc::new(Pipeline::new(config).context("Failed to build pipeline")?);

    if let Some(path) = options.model.filter(|p| p.exists()) {
        let loaded = load_baselines(&pipeline, path)?;
        info!(baselines = loaded, path = %path.display(), "Loaded baseline model");
    }

    if format != OutputFormat::Json {
        print_info(&format!(
            "Monitoring {} every {}s in {} mode (Ctrl-C to stop)",
            options.input.display(),
            options.interval.as_secs_f64(),
            options.mode
        ));
    }

    let source = Arc::new(ReplaySource::new(options.input));
    let monitor_config = MonitorConfig {
        interval: options.interval,
        mode: options.mode,
        ..MonitorConfig::default()
    };
    let (mut monitor, anomaly_rx) = MonitorLoop::new(source, pipeline.clone(), monitor_config);
    let printer = tokio::spawn(print_anomalies(anomaly_rx, format));

    match options.max_cycles {
        Some(cycles) => {
            for cycle in 0..cycles {
                if cycle > 0 {
                    tokio::time::sleep(options.interval).await;
                }
                monitor.tick().await;
            }
            drop(monitor);
        }
        None => {
            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            let handle = tokio::spawn(monitor.run(shutdown_rx));

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            info!("Received Ctrl-C, stopping");
            if shutdown_tx.send(()).is_err() {
                warn!("Monitor loop already stopped");
            }
            handle.await.context("Monitor loop panicked")?;
        }
    }

    // all senders are gone once the loop is dropped
    printer.await.context("Anomaly printer panicked")?;

    if options.mode == PipelineMode::Learn {
        if let Some(path) = options.model {
            save_baselines(&pipeline, path)?;
            info!(path = %path.display(), "Saved baseline model");
        }
    }

    if options.dump_metrics {
        eprint!("{}", AnalyzerMetrics::new().render());
    }
    Ok(())
}

async fn print_anomalies(mut rx: mpsc::Receiver<Anomaly>, format: OutputFormat) {
    while let Some(anomaly) = rx.recv().await {
        match format_live(&anomaly, format) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "Failed to format anomaly"),
        }
    }
}

/// One line per anomaly as it arrives; JSON output is newline-delimited
fn format_live(anomaly: &Anomaly, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(anomaly)?,
        OutputFormat::Text | OutputFormat::Table => format!(
            "[{}] {} {} {}: {}",
            anomaly.timestamp.format("%H:%M:%S"),
            color_severity(anomaly.level()),
            anomaly.entity,
            anomaly.anomaly_type,
            anomaly.description
        ),
    })
}
