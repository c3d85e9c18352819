//! NDJSON telemetry input
//!
//! One reading per line:
//! `{"entity": "checkout", "metric": "request_count", "value": 120.0,
//!   "timestamp": "2024-01-15T14:30:00Z", "labels": {"namespace": "shop"}}`
//! with `timestamp` and `labels` optional. Malformed lines are skipped.

use analyzer_lib::monitor::MetricsSource;
use analyzer_lib::MetricReading;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Parse every complete line of `data`; returns readings and the count of skipped lines
pub fn parse_readings(data: &str) -> (Vec<MetricReading>, usize) {
    let mut readings = Vec::new();
    let mut skipped = 0;
    for (index, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<MetricReading>(line) {
            Ok(reading) => readings.push(reading),
            Err(e) => {
                skipped += 1;
                warn!(line = index + 1, error = %e, "Skipping malformed reading");
            }
        }
    }
    (readings, skipped)
}

/// Load a whole NDJSON file
pub async fn read_readings(path: &Path) -> Result<Vec<MetricReading>> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read input file {:?}", path))?;
    let (readings, skipped) = parse_readings(&data);
    debug!(
        path = %path.display(),
        readings = readings.len(),
        skipped,
        "Loaded input file"
    );
    Ok(readings)
}

#[derive(Default)]
struct ReplayState {
    /// Bytes consumed so far (always at a line boundary)
    offset: u64,
    pending: HashMap<String, Vec<MetricReading>>,
}

/// Tails an NDJSON file, handing out lines appended since the last poll
pub struct ReplaySource {
    path: PathBuf,
    state: Mutex<ReplayState>,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(ReplayState::default()),
        }
    }

    /// Read whatever complete lines were appended since the last call
    async fn read_new_lines(&self, state: &mut ReplayState) -> Result<usize> {
        let mut file = tokio::fs::File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open input file {:?}", self.path))?;

        let len = file.metadata().await?.len();
        if len < state.offset {
            warn!(path = %self.path.display(), "Input file shrank, reading from the start");
            state.offset = 0;
        }

        file.seek(std::io::SeekFrom::Start(state.offset)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        // leave a partially written last line for the next poll
        let complete = match buf.iter().rposition(|b| *b == b'\n') {
            Some(pos) => pos + 1,
            None => return Ok(0),
        };
        state.offset += complete as u64;

        let text = String::from_utf8_lossy(&buf[..complete]);
        let (readings, _) = parse_readings(&text);
        let count = readings.len();
        for reading in readings {
            state
                .pending
                .entry(reading.entity.clone())
                .or_default()
                .push(reading);
        }
        Ok(count)
    }
}

#[async_trait]
impl MetricsSource for ReplaySource {
    async fn discover(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        let count = self.read_new_lines(&mut state).await?;
        debug!(readings = count, "Polled input file");

        let mut entities: Vec<String> = state
            .pending
            .iter()
            .filter(|(_, readings)| !readings.is_empty())
            .map(|(entity, _)| entity.clone())
            .collect();
        entities.sort();
        Ok(entities)
    }

    async fn collect(&self, entity: &str) -> Result<Vec<MetricReading>> {
        let mut state = self.state.lock().await;
        Ok(state.pending.remove(entity).unwrap_or_default())
    }
}
