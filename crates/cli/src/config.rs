//! Configuration loading for the CLI
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. YAML file (`--config`, else `~/.smanalyzer.yaml` when it exists)
//! 3. `SMANALYZER_*` environment variables, `__` between sections
//!    (e.g. `SMANALYZER_DETECTION__WINDOW_SIZE=20`)

use analyzer_lib::AnalyzerConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "SMANALYZER";
const DEFAULT_FILE_NAME: &str = ".smanalyzer.yaml";

/// Load and validate the effective configuration
pub fn load(explicit: Option<&Path>) -> Result<AnalyzerConfig> {
    let mut builder = config::Config::builder();

    match explicit {
        Some(path) => {
            builder = builder.add_source(
                config::File::from(path.to_path_buf()).format(config::FileFormat::Yaml),
            );
        }
        None => {
            if let Some(path) = default_config_path().filter(|p| p.exists()) {
                builder = builder.add_source(
                    config::File::from(path).format(config::FileFormat::Yaml),
                );
            }
        }
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to read configuration")?;

    let config: AnalyzerConfig = settings
        .try_deserialize()
        .context("Failed to parse configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// `~/.smanalyzer.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(DEFAULT_FILE_NAME))
}
