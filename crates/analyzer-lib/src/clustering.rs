//! K-means clustering over feature vectors
//!
//! Lloyd's algorithm with deterministic seeding: the input is split into K
//! contiguous blocks and each centroid starts at the first vector of its
//! block, so identical input always produces identical clusters.

use crate::error::{AnalyzerError, Result};
use crate::models::{FeatureVector, FEATURE_DIM};
use crate::stats::euclidean_distance;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_K: usize = 3;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_TOLERANCE: f64 = 0.01;

type Centroid = [f64; FEATURE_DIM];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Number of clusters
    #[serde(default = "default_k")]
    pub k: usize,
    /// Upper bound on Lloyd's iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Largest centroid displacement still considered converged
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_k() -> usize {
    DEFAULT_K
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl KMeansConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "clustering.k must be at least 1".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "clustering.max_iterations must be at least 1".into(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(AnalyzerError::InvalidConfig(format!(
                "clustering.tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// A centroid and the feature vectors assigned to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub centroid: Centroid,
    pub points: Vec<FeatureVector>,
}

impl Cluster {
    pub fn new(centroid: Centroid) -> Self {
        Self {
            centroid,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Mean squared distance of assigned points to the centroid, 0 when empty
    pub fn variance(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self
            .points
            .iter()
            .map(|p| euclidean_distance(&p.values, &self.centroid).powi(2))
            .sum();
        sum_sq / self.points.len() as f64
    }
}

/// Partitions feature vectors into K clusters
#[derive(Debug, Clone)]
pub struct ClusteringEngine {
    config: KMeansConfig,
}

impl ClusteringEngine {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Fit K clusters to `points`
    ///
    /// Fails with [`AnalyzerError::InsufficientPoints`] when there are fewer
    /// points than clusters. Every input vector ends up in exactly one cluster.
    pub fn fit(&self, points: &[FeatureVector]) -> Result<Vec<Cluster>> {
        let k = self.config.k;
        if k == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "clustering.k must be at least 1".into(),
            ));
        }
        if points.len() < k {
            return Err(AnalyzerError::InsufficientPoints {
                required: k,
                available: points.len(),
            });
        }

        let mut clusters: Vec<Cluster> = self
            .initial_centroids(points)
            .into_iter()
            .map(Cluster::new)
            .collect();
        let mut assignments = vec![0usize; points.len()];
        let mut iterations = 0;
        let mut converged = false;

        for _ in 0..self.config.max_iterations.max(1) {
            iterations += 1;
            let previous: Vec<Centroid> = clusters.iter().map(|c| c.centroid).collect();

            assign_points(points, &previous, &mut assignments);
            let centroids = update_centroids(points, &assignments, &previous);
            clusters = build_clusters(points, &assignments, centroids);

            if self.has_converged(&previous, &clusters) {
                converged = true;
                break;
            }
        }

        debug!(
            k,
            points = points.len(),
            iterations,
            converged,
            "K-means fit complete"
        );
        Ok(clusters)
    }

    /// True when every cluster moved by at most the configured tolerance
    pub fn has_converged(&self, old_centroids: &[Centroid], clusters: &[Cluster]) -> bool {
        old_centroids
            .iter()
            .zip(clusters.iter())
            .all(|(old, cluster)| euclidean_distance(old, &cluster.centroid) <= self.config.tolerance)
    }

    /// Seed centroid `i` from the vector at `i * len / k`
    fn initial_centroids(&self, points: &[FeatureVector]) -> Vec<Centroid> {
        let k = self.config.k;
        (0..k).map(|i| points[i * points.len() / k].values).collect()
    }
}

impl Default for ClusteringEngine {
    fn default() -> Self {
        Self::new(KMeansConfig::default())
    }
}

/// Index of the nearest centroid; ties go to the lowest index
pub fn nearest_centroid(values: &[f64], centroids: &[Centroid]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = euclidean_distance(values, centroid);
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}

fn assign_points(points: &[FeatureVector], centroids: &[Centroid], assignments: &mut [usize]) {
    for (point, slot) in points.iter().zip(assignments.iter_mut()) {
        *slot = nearest_centroid(&point.values, centroids);
    }
}

fn build_clusters(
    points: &[FeatureVector],
    assignments: &[usize],
    centroids: Vec<Centroid>,
) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = centroids.into_iter().map(Cluster::new).collect();
    for (point, &cluster) in points.iter().zip(assignments.iter()) {
        clusters[cluster].points.push(point.clone());
    }
    clusters
}

/// Per-dimension mean of assigned points; empty clusters keep `previous`
fn update_centroids(
    points: &[FeatureVector],
    assignments: &[usize],
    previous: &[Centroid],
) -> Vec<Centroid> {
    let mut sums = vec![[0.0; FEATURE_DIM]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, &cluster) in points.iter().zip(assignments.iter()) {
        counts[cluster] += 1;
        for (sum, value) in sums[cluster].iter_mut().zip(point.values.iter()) {
            *sum += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous.iter())
        .map(|((mut sum, count), prev)| {
            if count == 0 {
                return *prev;
            }
            for value in sum.iter_mut() {
                *value /= count as f64;
            }
            sum
        })
        .collect()
}
