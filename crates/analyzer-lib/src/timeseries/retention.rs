//! Retention policy bounding per-series growth
//!
//! Unbounded by default. When configured, eviction runs on every append to
//! the series being written and only ever drops points from the front.

use crate::models::Sample;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Drop points older than this many seconds (relative to the newest append)
    #[serde(default)]
    pub max_age_secs: Option<u64>,
    /// Keep at most this many points per series
    #[serde(default)]
    pub max_points: Option<usize>,
}

impl RetentionPolicy {
    /// Policy that never evicts
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_age_secs(mut self, secs: u64) -> Self {
        self.max_age_secs = Some(secs);
        self
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = Some(max_points);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_age_secs.is_none() && self.max_points.is_none()
    }

    /// Evict expired and overflowing points, returning how many were dropped
    pub(crate) fn apply(&self, points: &mut VecDeque<Sample>, now: DateTime<Utc>) -> usize {
        let before = points.len();

        if let Some(cutoff) = self.cutoff(now) {
            while let Some(front) = points.front() {
                if front.timestamp < cutoff {
                    points.pop_front();
                } else {
                    break;
                }
            }
        }

        if let Some(max_points) = self.max_points {
            while points.len() > max_points {
                points.pop_front();
            }
        }

        before - points.len()
    }

    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.max_age_secs?).ok()?;
        now.checked_sub_signed(TimeDelta::try_seconds(secs)?)
    }
}
