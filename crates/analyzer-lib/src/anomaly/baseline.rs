//! Learned per-entity baselines
//!
//! A baseline is immutable once built. Relearning builds a new one and swaps
//! the `Arc` in the registry, so a detector holding the previous baseline
//! keeps a consistent view until it is done.

use crate::clustering::Cluster;
use crate::error::{AnalyzerError, Result};
use crate::stats::{euclidean_distance, ratio_or};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Snapshot format version written by [`BaselineRegistry::save`]
pub const SNAPSHOT_VERSION: u32 = 1;

/// Clusters learned from an entity's normal behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub entity: String,
    pub clusters: Vec<Cluster>,
    pub learned_at: DateTime<Utc>,
    /// Sensitivity the baseline was learned with
    pub sensitivity: f64,
}

impl Baseline {
    pub fn new(entity: impl Into<String>, clusters: Vec<Cluster>, sensitivity: f64) -> Self {
        Self {
            entity: entity.into(),
            clusters,
            learned_at: Utc::now(),
            sensitivity,
        }
    }

    pub fn total_points(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }

    /// Distance from `values` to the closest centroid
    pub fn nearest_distance(&self, values: &[f64]) -> Option<f64> {
        self.clusters
            .iter()
            .map(|c| euclidean_distance(values, &c.centroid))
            .fold(None, |best: Option<f64>, d| match best {
                Some(b) if b <= d => Some(b),
                _ => Some(d),
            })
    }

    /// Size-weighted mean of the per-cluster variances
    pub fn pooled_variance(&self) -> f64 {
        let total = self.total_points();
        if total == 0 {
            return 0.0;
        }
        let weighted: f64 = self
            .clusters
            .iter()
            .map(|c| c.variance() * c.len() as f64)
            .sum();
        weighted / total as f64
    }

    /// `sqrt(pooled variance) * sensitivity`
    ///
    /// Falls back to 1.0 when the baseline holds no points or the threshold
    /// collapses to zero.
    pub fn dynamic_threshold(&self, sensitivity: f64) -> f64 {
        if self.total_points() == 0 {
            return 1.0;
        }
        let threshold = self.pooled_variance().sqrt() * sensitivity;
        if !threshold.is_finite() || threshold <= f64::EPSILON {
            return 1.0;
        }
        threshold
    }

    pub fn threshold(&self) -> f64 {
        self.dynamic_threshold(self.sensitivity)
    }

    /// Severity of a distance relative to the threshold
    pub fn severity(&self, distance: f64, sensitivity: f64) -> f64 {
        ratio_or(distance, self.dynamic_threshold(sensitivity), 1.0)
    }
}

/// On-disk form of a registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub baselines: Vec<Baseline>,
}

/// Entity -> current baseline
#[derive(Debug, Default)]
pub struct BaselineRegistry {
    baselines: DashMap<String, Arc<Baseline>>,
}

impl BaselineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current baseline; the map guard is released before returning
    pub fn get(&self, entity: &str) -> Option<Arc<Baseline>> {
        self.baselines.get(entity).map(|b| Arc::clone(b.value()))
    }

    /// Swap in a new baseline, returning the one it replaced
    pub fn replace(&self, baseline: Baseline) -> Option<Arc<Baseline>> {
        self.insert(Arc::new(baseline))
    }

    /// Swap in a shared baseline; returns the one it displaced
    pub fn insert(&self, baseline: Arc<Baseline>) -> Option<Arc<Baseline>> {
        self.baselines.insert(baseline.entity.clone(), baseline)
    }

    pub fn remove(&self, entity: &str) -> Option<Arc<Baseline>> {
        self.baselines.remove(entity).map(|(_, b)| b)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.baselines.contains_key(entity)
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }

    /// Entities with a baseline, sorted
    pub fn entities(&self) -> Vec<String> {
        let mut entities: Vec<String> = self.baselines.iter().map(|e| e.key().clone()).collect();
        entities.sort();
        entities
    }

    /// Owned copies of every baseline, sorted by entity
    pub fn snapshot(&self) -> Vec<Baseline> {
        let mut baselines: Vec<Baseline> = self
            .baselines
            .iter()
            .map(|e| e.value().as_ref().clone())
            .collect();
        baselines.sort_by(|a, b| a.entity.cmp(&b.entity));
        baselines
    }

    /// Replace entries for every entity in `baselines`; returns how many were loaded
    pub fn restore(&self, baselines: Vec<Baseline>) -> usize {
        let count = baselines.len();
        for baseline in baselines {
            self.replace(baseline);
        }
        count
    }

    /// Write all baselines as JSON, through a temp file and a rename
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let snapshot = BaselineSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            baselines: self.snapshot(),
        };
        let json = serde_json::to_vec_pretty(&snapshot)?;

        let temp_path = path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;

        debug!(
            path = %path.display(),
            baselines = snapshot.baselines.len(),
            "Saved baseline snapshot"
        );
        Ok(())
    }

    /// Load a snapshot written by [`save`](Self::save) into this registry
    pub fn load(&self, path: &Path) -> Result<usize> {
        let snapshot = read_snapshot(path)?;
        Ok(self.restore(snapshot.baselines))
    }
}

/// Parse a snapshot file without touching any registry
pub fn read_snapshot(path: &Path) -> Result<BaselineSnapshot> {
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;
    let snapshot: BaselineSnapshot = serde_json::from_slice(&data)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(AnalyzerError::InvalidConfig(format!(
            "unsupported baseline snapshot version {} (expected {})",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }
    Ok(snapshot)
}
