//! Baseline learning command

use super::{pipeline_from_file, save_baselines};
use crate::output::{print_info, print_success, print_warning, OutputFormat};
use analyzer_lib::pipeline::LearnSummary;
use analyzer_lib::{AnalyzerConfig, Pipeline};
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

/// Row for the learned baselines table
#[derive(Tabled, Serialize)]
pub struct BaselineRow {
    #[tabled(rename = "Entity")]
    pub entity: String,
    #[tabled(rename = "Clusters")]
    pub clusters: usize,
    #[tabled(rename = "Points")]
    pub points: usize,
    #[tabled(rename = "Threshold")]
    pub threshold: String,
    #[tabled(rename = "Learned At")]
    pub learned_at: String,
}

#[derive(Serialize)]
struct SkippedEntity<'a> {
    entity: &'a str,
    reason: &'a str,
}

/// Learn baselines for every entity in `input`, optionally saving them
pub async fn learn_baselines(
    config: &AnalyzerConfig,
    input: &Path,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let pipeline = pipeline_from_file(config, input).await?;
    learn_and_report(&pipeline, output, format)
}

pub(crate) fn learn_and_report(
    pipeline: &Pipeline,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let summary = pipeline.learn_all()?;

    if let Some(path) = output {
        save_baselines(pipeline, path)?;
    }

    print_summary(&summary, output, format)
}

fn print_summary(summary: &LearnSummary, output: Option<&Path>, format: OutputFormat) -> Result<()> {
    let rows: Vec<BaselineRow> = summary
        .learned
        .iter()
        .map(|b| BaselineRow {
            entity: b.entity.clone(),
            clusters: b.clusters.len(),
            points: b.total_points(),
            threshold: format!("{:.4}", b.threshold()),
            learned_at: b.learned_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let skipped: Vec<SkippedEntity> = summary
                .skipped
                .iter()
                .map(|(entity, reason)| SkippedEntity { entity, reason })
                .collect();
            let json = serde_json::json!({
                "learned": rows,
                "skipped": skipped,
                "output": output.map(|p| p.display().to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text | OutputFormat::Table => {
            println!("{}", "Baseline Learning".bold());
            println!("{}", "=".repeat(60));

            if rows.is_empty() {
                print_warning("No baselines learned");
            } else {
                let table = tabled::Table::new(&rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }

            for (entity, reason) in &summary.skipped {
                print_warning(&format!("Skipped {}: {}", entity.cyan(), reason));
            }
            if let Some(path) = output {
                print_info(&format!("Baselines saved to {}", path.display()));
            }
            print_success(&format!(
                "Learned {} baselines ({} skipped)",
                summary.learned.len(),
                summary.skipped.len()
            ));
        }
    }
    Ok(())
}
