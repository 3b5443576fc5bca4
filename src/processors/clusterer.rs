use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_MINI_BATCH_SIZE, DEFAULT_SEED, DEFAULT_TOLERANCE,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Result of partitioning N points into K groups.
#[derive(Debug, Clone)]
pub struct Partition {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
    pub iterations: usize,
}

impl Partition {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Centroid-based partitioning of feature vectors.
pub trait Partitioner {
    fn k(&self) -> usize;
    fn fit(&self, points: &[Vec<f64>]) -> Result<Partition>;
}

/// Full-batch Lloyd iterations from a k-means++ start.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    seed: u64,
    max_iterations: usize,
    tolerance: f64,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            seed: DEFAULT_SEED,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Partitioner for KMeans {
    fn k(&self) -> usize {
        self.k
    }

    fn fit(&self, points: &[Vec<f64>]) -> Result<Partition> {
        check_input(points, self.k)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = kmeans_plus_plus(points, self.k, &mut rng);
        let mut labels = assign(points, &centroids);
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            let next = recompute(points, &labels, &centroids);
            let shift: f64 = centroids
                .iter()
                .zip(&next)
                .map(|(old, new)| squared_distance(old, new))
                .sum();
            centroids = next;
            labels = assign(points, &centroids);
            if shift <= self.tolerance {
                break;
            }
        }

        debug!("k-means converged after {} iterations", iterations);
        Ok(finish(points, labels, centroids, iterations))
    }
}

/// Centroid updates from random batches, for large populations.
#[derive(Debug, Clone)]
pub struct MiniBatchKMeans {
    k: usize,
    seed: u64,
    max_iterations: usize,
    batch_size: usize,
    tolerance: f64,
}

impl MiniBatchKMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            seed: DEFAULT_SEED,
            max_iterations: 100,
            batch_size: DEFAULT_MINI_BATCH_SIZE,
            tolerance: 0.0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Stop early once a batch moves the centroids less than this in total.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Partitioner for MiniBatchKMeans {
    fn k(&self) -> usize {
        self.k
    }

    fn fit(&self, points: &[Vec<f64>]) -> Result<Partition> {
        check_input(points, self.k)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = kmeans_plus_plus(points, self.k, &mut rng);
        let mut counts = vec![0usize; self.k];
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            let before = centroids.clone();

            for _ in 0..self.batch_size {
                let point = &points[rng.random_range(0..points.len())];
                let (c, _) = nearest(point, &centroids);
                counts[c] += 1;
                let eta = 1.0 / counts[c] as f64;
                for (x, center) in point.iter().zip(centroids[c].iter_mut()) {
                    *center += eta * (x - *center);
                }
            }

            let shift: f64 = before
                .iter()
                .zip(&centroids)
                .map(|(old, new)| squared_distance(old, new))
                .sum();
            if shift <= self.tolerance {
                break;
            }
        }

        debug!("mini-batch k-means stopped after {} batches", iterations);
        let labels = assign(points, &centroids);
        Ok(finish(points, labels, centroids, iterations))
    }
}

fn check_input(points: &[Vec<f64>], k: usize) -> Result<()> {
    if k == 0 {
        return Err(ProcessingError::Clustering(
            "number of clusters must be at least 1".to_string(),
        ));
    }
    if points.len() < k {
        return Err(ProcessingError::Clustering(format!(
            "number of points ({}) must be at least the number of clusters ({})",
            points.len(),
            k
        )));
    }
    let dim = points[0].len();
    if points.iter().any(|p| p.len() != dim) {
        return Err(ProcessingError::Clustering(
            "feature vectors have different lengths".to_string(),
        ));
    }
    if points.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ProcessingError::Clustering(
            "feature vectors contain non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// Seed centres with probability proportional to squared distance from the
/// centres chosen so far.
fn kmeans_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..points.len())].clone());

    let mut distances: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = distances.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut acc = 0.0;
            distances
                .iter()
                .position(|d| {
                    acc += d;
                    acc > target
                })
                .unwrap_or_else(|| {
                    distances
                        .iter()
                        .rposition(|d| *d > 0.0)
                        .unwrap_or(points.len() - 1)
                })
        } else {
            // Every point sits on a centre already; duplicates are unavoidable.
            rng.random_range(0..points.len())
        };

        let center = points[chosen].clone();
        for (d, p) in distances.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &center));
        }
        centroids.push(center);
    }

    centroids
}

fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    points.iter().map(|p| nearest(p, centroids).0).collect()
}

/// Mean of each cluster's members; an empty cluster keeps its centre.
fn recompute(points: &[Vec<f64>], labels: &[usize], centroids: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dim = centroids[0].len();
    let mut sums = vec![vec![0.0; dim]; centroids.len()];
    let mut counts = vec![0usize; centroids.len()];

    for (p, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (s, v) in sums[label].iter_mut().zip(p) {
            *s += v;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(centroids)
        .map(|((sum, count), old)| {
            if count == 0 {
                old.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}

fn finish(
    points: &[Vec<f64>],
    labels: Vec<usize>,
    centroids: Vec<Vec<f64>>,
    iterations: usize,
) -> Partition {
    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &label)| squared_distance(p, &centroids[label]))
        .sum();
    Partition {
        labels,
        centroids,
        inertia,
        iterations,
    }
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, candidate| {
            if candidate.1 < best.1 {
                candidate
            } else {
                best
            }
        })
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn three_points() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 10.0, 5.0],
            vec![1.0, 20.0, 12.0],
            vec![2.0, 15.0, 10.0],
        ]
    }

    fn blobs() -> Vec<Vec<f64>> {
        let mut points = Vec::new();
        for i in 0..30 {
            let jitter = (i % 5) as f64 * 0.1;
            points.push(vec![0.0 + jitter, 0.0 - jitter]);
            points.push(vec![10.0 + jitter, 10.0 + jitter]);
            points.push(vec![-10.0 - jitter, 10.0 - jitter]);
        }
        points
    }

    #[test]
    fn test_three_points_get_distinct_deterministic_labels() {
        let model = KMeans::new(3).with_seed(42);
        let first = model.fit(&three_points()).unwrap();
        let second = model.fit(&three_points()).unwrap();

        let distinct: HashSet<usize> = first.labels.iter().copied().collect();
        assert_eq!(distinct.len(), 3);
        assert_eq!(first.labels, second.labels);
        assert_eq!(first.inertia, 0.0);
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let points = blobs();
        let partition = KMeans::new(3).fit(&points).unwrap();

        assert_eq!(partition.cluster_sizes(), vec![30, 30, 30]);
        for triple in partition.labels.chunks(3) {
            let distinct: HashSet<usize> = triple.iter().copied().collect();
            assert_eq!(distinct.len(), 3);
        }
    }

    #[test]
    fn test_mini_batch_matches_full_batch_grouping() {
        let points = blobs();
        let full = KMeans::new(3).fit(&points).unwrap();
        let mini = MiniBatchKMeans::new(3)
            .with_batch_size(16)
            .with_max_iterations(50)
            .fit(&points)
            .unwrap();

        assert_eq!(mini.labels.len(), points.len());
        assert_eq!(mini.cluster_sizes(), vec![30, 30, 30]);
        // Same grouping, possibly different label numbers.
        for i in 0..points.len() {
            for j in 0..points.len() {
                assert_eq!(
                    full.labels[i] == full.labels[j],
                    mini.labels[i] == mini.labels[j]
                );
            }
        }
    }

    #[test]
    fn test_mini_batch_is_deterministic() {
        let points = blobs();
        let model = MiniBatchKMeans::new(3).with_seed(7).with_batch_size(8);
        assert_eq!(
            model.fit(&points).unwrap().labels,
            model.fit(&points).unwrap().labels
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(KMeans::new(3).fit(&three_points()[..2]).is_err());
        assert!(KMeans::new(0).fit(&three_points()).is_err());
        assert!(MiniBatchKMeans::new(2)
            .fit(&[vec![1.0], vec![1.0, 2.0]])
            .is_err());
        assert!(KMeans::new(1).fit(&[vec![f64::NAN]]).is_err());
    }

    #[test]
    fn test_duplicate_points_still_partition() {
        let points = vec![vec![1.0, 1.0]; 4];
        let partition = KMeans::new(2).fit(&points).unwrap();
        assert_eq!(partition.labels.len(), 4);
        assert_eq!(partition.inertia, 0.0);
    }
}
