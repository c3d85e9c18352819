//! Subcommand implementations

pub mod learn;
pub mod monitor;
pub mod scan;
pub mod status;

use crate::source::read_readings;
use analyzer_lib::{AnalyzerConfig, Pipeline};
use anyhow::{Context, Result};
use std::path::Path;

/// Build a pipeline and ingest every reading in `input`
pub(crate) async fn pipeline_from_file(config: &AnalyzerConfig, input: &Path) -> Result<Pipeline> {
    let pipeline = Pipeline::new(config).context("Failed to build pipeline")?;
    let readings = read_readings(input).await?;
    pipeline.ingest_all(readings);
    Ok(pipeline)
}

/// Load a baseline snapshot into the pipeline's registry
pub(crate) fn load_baselines(pipeline: &Pipeline, path: &Path) -> Result<usize> {
    pipeline
        .detector()
        .baselines()
        .load(path)
        .with_context(|| format!("Failed to load baselines from {:?}", path))
}

/// Write the pipeline's baselines as a snapshot
pub(crate) fn save_baselines(pipeline: &Pipeline, path: &Path) -> Result<()> {
    pipeline
        .detector()
        .baselines()
        .save(path)
        .with_context(|| format!("Failed to save baselines to {:?}", path))
}
