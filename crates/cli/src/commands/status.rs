//! Effective configuration, input summary and baseline snapshot summary

use super::pipeline_from_file;
use crate::output::{print_warning, OutputFormat};
use analyzer_lib::anomaly::read_snapshot;
use analyzer_lib::AnalyzerConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
struct EntityRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Metrics")]
    metrics: String,
    #[tabled(rename = "Samples")]
    samples: usize,
}

#[derive(Debug, Serialize)]
struct StoreSummary {
    path: String,
    entities: usize,
    series: usize,
    samples: usize,
    details: Vec<EntityRow>,
}

#[derive(Debug, Serialize, Tabled)]
struct BaselineRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Clusters")]
    clusters: usize,
    #[tabled(rename = "Points")]
    points: usize,
    #[tabled(rename = "Threshold")]
    threshold: String,
    #[tabled(rename = "Learned At")]
    learned_at: String,
}

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    config_file: Option<String>,
    config: &'a AnalyzerConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<StoreSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    baselines: Option<Vec<BaselineRow>>,
}

pub async fn show_status(
    config: &AnalyzerConfig,
    config_file: Option<&Path>,
    input: Option<&Path>,
    baselines: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let store = match input {
        Some(path) => Some(summarize_input(config, path).await?),
        None => None,
    };
    let baselines = match baselines {
        Some(path) => Some(summarize_baselines(path)?),
        None => None,
    };

    let report = StatusReport {
        config_file: config_file.map(|p| p.display().to_string()),
        config,
        store,
        baselines,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text | OutputFormat::Table => print_report(&report),
    }
    Ok(())
}

async fn summarize_input(config: &AnalyzerConfig, path: &Path) -> Result<StoreSummary> {
    let pipeline = pipeline_from_file(config, path).await?;
    let store = pipeline.store();

    let details = store
        .entities()
        .into_iter()
        .map(|entity| {
            let metrics = store.metrics_for(&entity);
            let samples = metrics.iter().map(|m| store.len_of(&entity, m)).sum();
            EntityRow {
                metrics: metrics.join(", "),
                entity,
                samples,
            }
        })
        .collect::<Vec<_>>();

    Ok(StoreSummary {
        path: path.display().to_string(),
        entities: details.len(),
        series: store.series_count(),
        samples: store.total_points(),
        details,
    })
}

fn summarize_baselines(path: &Path) -> Result<Vec<BaselineRow>> {
    let snapshot = read_snapshot(path)
        .with_context(|| format!("Failed to read baseline snapshot {:?}", path))?;
    Ok(snapshot
        .baselines
        .iter()
        .map(|b| BaselineRow {
            entity: b.entity.clone(),
            clusters: b.clusters.len(),
            points: b.total_points(),
            threshold: format!("{:.4}", b.threshold()),
            learned_at: b.learned_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect())
}

fn print_report(report: &StatusReport<'_>) {
    let detection = &report.config.detection;
    let clustering = &report.config.clustering;
    let pipeline = &report.config.pipeline;

    println!("{}", "Service Mesh Analyzer Status".bold());
    println!("{}", "=".repeat(60));

    println!("\n{}", "Configuration:".bold());
    println!(
        "  Source:                  {}",
        report.config_file.as_deref().unwrap_or("defaults + environment")
    );
    println!(
        "  Traffic spike threshold: {}x",
        detection.traffic_spike_threshold
    );
    println!(
        "  Error rate threshold:    {:.2}%",
        detection.error_rate_threshold * 100.0
    );
    println!("  Latency threshold:       {}ms", detection.latency_threshold_ms);
    println!("  Retry threshold:         {}", detection.retry_threshold);
    println!("  Timeout threshold:       {}", detection.timeout_threshold);
    println!(
        "  Circuit breaker limit:   {}",
        detection.circuit_breaker_threshold
    );
    println!("  Window size:             {}", detection.window_size);
    println!("  Sensitivity level:       {}", detection.sensitivity_level);
    println!(
        "  Clustering:              k={} max_iterations={} tolerance={}",
        clustering.k, clustering.max_iterations, clustering.tolerance
    );
    println!(
        "  Traffic metric:          {} (lookback {})",
        pipeline.traffic_metric, pipeline.lookback
    );

    if let Some(store) = &report.store {
        println!("\n{}", "Input:".bold());
        println!("  File:     {}", store.path.cyan());
        println!("  Entities: {}", store.entities);
        println!("  Series:   {}", store.series);
        println!("  Samples:  {}", store.samples);
        if !store.details.is_empty() {
            let table = tabled::Table::new(&store.details)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    if let Some(baselines) = &report.baselines {
        println!("\n{}", "Baselines:".bold());
        if baselines.is_empty() {
            print_warning("Snapshot contains no baselines");
        } else {
            let table = tabled::Table::new(baselines)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }
}
