//! One-shot scan over a file of readings

use super::{learn::learn_and_report, load_baselines, pipeline_from_file};
use crate::output::{print_info, render_anomalies, OutputFormat};
use analyzer_lib::AnalyzerConfig;
use anyhow::Result;
use std::path::Path;

pub struct ScanOptions<'a> {
    pub input: &'a Path,
    /// Restrict detection to one entity
    pub entity: Option<&'a str>,
    /// Learn baselines instead of detecting
    pub learn: bool,
    /// Snapshot to load before detecting, or to write after learning
    pub baselines: Option<&'a Path>,
}

pub async fn scan(config: &AnalyzerConfig, options: ScanOptions<'_>, format: OutputFormat) -> Result<()> {
    let pipeline = pipeline_from_file(config, options.input).await?;

    if options.learn {
        return learn_and_report(&pipeline, options.baselines, format);
    }

    if let Some(path) = options.baselines {
        let loaded = load_baselines(&pipeline, path)?;
        if format != OutputFormat::Json {
            print_info(&format!("Loaded {} baselines from {}", loaded, path.display()));
        }
    }

    if format != OutputFormat::Json {
        print_info(&format!(
            "Scanning {} entities ({} samples)",
            pipeline.store().entities().len(),
            pipeline.store().total_points()
        ));
    }

    let anomalies = match options.entity {
        Some(entity) => pipeline.scan(entity),
        None => pipeline.scan_all(),
    };

    print!("{}", render_anomalies(&anomalies, format)?);
    Ok(())
}
