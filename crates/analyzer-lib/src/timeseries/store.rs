//! Time-series store
//!
//! Two-level locking: the `DashMap` shard lock serializes creation of a new
//! series entry, and each series has its own `RwLock` for appends and reads.

use super::RetentionPolicy;
use crate::models::Sample;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Identity of one series
///
/// Entity and metric stay separate fields; `Display` joins them with `:`
/// for logs only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub entity: String,
    pub metric: String,
}

impl SeriesKey {
    pub fn new(entity: &str, metric: &str) -> Self {
        Self {
            entity: entity.to_string(),
            metric: metric.to_string(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.metric)
    }
}

/// Snapshot of one series at the time it was read
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub entity: String,
    pub metric: String,
    pub points: Vec<Sample>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Live series owned by the store
struct SeriesCell {
    entity: String,
    metric: String,
    points: RwLock<VecDeque<Sample>>,
}

impl SeriesCell {
    fn new(entity: &str, metric: &str) -> Self {
        Self {
            entity: entity.to_string(),
            metric: metric.to_string(),
            points: RwLock::new(VecDeque::new()),
        }
    }

    /// Run `f` under the read lock; a poisoned lock still yields its data
    fn read<T>(&self, f: impl FnOnce(&VecDeque<Sample>) -> T) -> T {
        let guard = self.points.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}

/// Append-only in-memory store of per-(entity, metric) series
pub struct TimeSeriesStore {
    series: DashMap<SeriesKey, Arc<SeriesCell>>,
    retention: RetentionPolicy,
}

impl Default for TimeSeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSeriesStore {
    /// Create an unbounded store
    pub fn new() -> Self {
        Self::with_retention(RetentionPolicy::unbounded())
    }

    /// Create a store that evicts according to `retention`
    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            series: DashMap::new(),
            retention,
        }
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// Append a sample stamped with the current time
    pub fn append(
        &self,
        entity: &str,
        metric: &str,
        value: f64,
        labels: HashMap<String, String>,
    ) {
        self.append_at(entity, metric, Utc::now(), value, labels);
    }

    /// Append a sample with an explicit timestamp
    ///
    /// Points keep insertion order; the timestamp is stored as given.
    pub fn append_at(
        &self,
        entity: &str,
        metric: &str,
        timestamp: DateTime<Utc>,
        value: f64,
        labels: HashMap<String, String>,
    ) {
        let cell = self.cell_or_create(entity, metric);
        let mut points = cell.points.write().unwrap_or_else(PoisonError::into_inner);
        points.push_back(Sample {
            timestamp,
            value,
            labels,
        });

        if !self.retention.is_unbounded() {
            let evicted = self.retention.apply(&mut points, timestamp);
            if evicted > 0 {
                debug!(entity = %entity, metric = %metric, evicted, "Evicted samples past retention");
            }
        }
    }

    /// Snapshot of a whole series
    pub fn get(&self, entity: &str, metric: &str) -> Option<Series> {
        let cell = self.cell(entity, metric)?;
        let points = cell.read(|points| points.iter().cloned().collect());
        Some(Series {
            entity: cell.entity.clone(),
            metric: cell.metric.clone(),
            points,
        })
    }

    /// Samples with `start < timestamp < end`; empty when the series is absent
    pub fn range_between(
        &self,
        entity: &str,
        metric: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Sample> {
        let Some(cell) = self.cell(entity, metric) else {
            return Vec::new();
        };
        cell.read(|points| {
            points
                .iter()
                .filter(|p| p.timestamp > start && p.timestamp < end)
                .cloned()
                .collect()
        })
    }

    /// The last `min(n, len)` samples in insertion order; empty when absent
    pub fn latest_n(&self, entity: &str, metric: &str, n: usize) -> Vec<Sample> {
        let Some(cell) = self.cell(entity, metric) else {
            return Vec::new();
        };
        cell.read(|points| {
            let skip = points.len().saturating_sub(n);
            points.iter().skip(skip).cloned().collect()
        })
    }

    /// Number of samples currently held for a series
    pub fn len_of(&self, entity: &str, metric: &str) -> usize {
        self.cell(entity, metric)
            .map(|cell| cell.read(|points| points.len()))
            .unwrap_or(0)
    }

    /// Distinct entity names, sorted
    pub fn entities(&self) -> Vec<String> {
        self.series
            .iter()
            .map(|entry| entry.value().entity.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Metric names recorded for an entity, sorted
    pub fn metrics_for(&self, entity: &str) -> Vec<String> {
        self.series
            .iter()
            .filter(|entry| entry.value().entity == entity)
            .map(|entry| entry.value().metric.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn total_points(&self) -> usize {
        self.series
            .iter()
            .map(|entry| entry.value().read(|points| points.len()))
            .sum()
    }

    /// Look up a series without holding the map guard past the call
    fn cell(&self, entity: &str, metric: &str) -> Option<Arc<SeriesCell>> {
        self.series
            .get(&SeriesKey::new(entity, metric))
            .map(|entry| Arc::clone(entry.value()))
    }

    fn cell_or_create(&self, entity: &str, metric: &str) -> Arc<SeriesCell> {
        if let Some(cell) = self.cell(entity, metric) {
            return cell;
        }
        let key = SeriesKey::new(entity, metric);
        let entry = self.series.entry(key).or_insert_with(|| {
            debug!(entity = %entity, metric = %metric, "Creating series");
            Arc::new(SeriesCell::new(entity, metric))
        });
        Arc::clone(entry.value())
    }
}
