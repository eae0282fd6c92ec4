//! Seeded k-means clustering
//!
//! Lloyd iterations with k-means++ initialisation drawn from a `StdRng` seeded
//! by the caller, so identical input and seed always give the same partition.
//! The fit is restarted from several seedings and the lowest-inertia run kept.

use crate::{MathError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// K-means configuration
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iterations: usize,
    seed: u64,
    restarts: usize,
}

/// Seedings tried by default
pub const DEFAULT_RESTARTS: usize = 10;

/// Result of fitting k-means
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster index of every input row
    pub assignments: Vec<usize>,
    /// Final cluster centres
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances of rows to their centre
    pub inertia: f64,
    /// Number of Lloyd iterations performed
    pub iterations: usize,
}

impl KMeans {
    /// Create a new k-means configuration
    pub fn new(k: usize, max_iterations: usize, seed: u64) -> Result<Self> {
        if k == 0 {
            return Err(MathError::InvalidInput(
                "Cluster count must be greater than zero".to_string(),
            ));
        }
        if max_iterations == 0 {
            return Err(MathError::InvalidInput(
                "Iteration limit must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            k,
            max_iterations,
            seed,
            restarts: DEFAULT_RESTARTS,
        })
    }

    /// Number of independent seedings to try (at least one)
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts.max(1);
        self
    }

    /// Number of clusters requested
    pub fn k(&self) -> usize {
        self.k
    }

    /// Partition `rows` into `k` clusters
    pub fn fit(&self, rows: &[Vec<f64>]) -> Result<KMeansFit> {
        if rows.len() < self.k {
            return Err(MathError::InsufficientData(format!(
                "Need at least {} rows for {} clusters, have {}",
                self.k,
                self.k,
                rows.len()
            )));
        }
        let width = rows[0].len();
        if width == 0 || rows.iter().any(|r| r.len() != width) {
            return Err(MathError::InvalidInput(
                "Rows must be non-empty and of equal width".to_string(),
            ));
        }
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Feature values must be finite".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best = self.run_once(rows, &mut rng);
        for _ in 1..self.restarts {
            let candidate = self.run_once(rows, &mut rng);
            if candidate.inertia < best.inertia {
                best = candidate;
            }
        }
        Ok(best)
    }

    fn run_once(&self, rows: &[Vec<f64>], rng: &mut StdRng) -> KMeansFit {
        let mut centroids = self.initial_centroids(rows, rng);
        let mut assignments = assign(rows, &centroids);
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            centroids = recompute_centroids(rows, &assignments, &centroids);
            let next = assign(rows, &centroids);
            if next == assignments {
                break;
            }
            assignments = next;
        }

        let inertia = rows
            .iter()
            .zip(&assignments)
            .map(|(row, &c)| squared_distance(row, &centroids[c]))
            .sum();

        KMeansFit {
            assignments,
            centroids,
            inertia,
            iterations,
        }
    }

    /// k-means++ seeding
    fn initial_centroids(&self, rows: &[Vec<f64>], rng: &mut StdRng) -> Vec<Vec<f64>> {
        let mut chosen: Vec<usize> = Vec::with_capacity(self.k);
        chosen.push(rng.gen_range(0..rows.len()));

        while chosen.len() < self.k {
            let distances: Vec<f64> = rows
                .iter()
                .map(|row| {
                    chosen
                        .iter()
                        .map(|&c| squared_distance(row, &rows[c]))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect();
            let total: f64 = distances.iter().sum();

            let next = if total <= 0.0 {
                // every remaining row coincides with a centre
                (0..rows.len()).find(|i| !chosen.contains(i)).unwrap_or(0)
            } else {
                let target = rng.gen::<f64>() * total;
                let mut running = 0.0;
                let mut pick = rows.len() - 1;
                for (i, d) in distances.iter().enumerate() {
                    running += d;
                    if running >= target && *d > 0.0 {
                        pick = i;
                        break;
                    }
                }
                pick
            };
            chosen.push(next);
        }

        chosen.into_iter().map(|i| rows[i].clone()).collect()
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn assign(rows: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    rows.iter()
        .map(|row| {
            centroids
                .iter()
                .enumerate()
                .map(|(i, c)| (i, squared_distance(row, c)))
                .fold((0, f64::INFINITY), |best, (i, d)| {
                    if d < best.1 {
                        (i, d)
                    } else {
                        best
                    }
                })
                .0
        })
        .collect()
}

fn recompute_centroids(
    rows: &[Vec<f64>],
    assignments: &[usize],
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let width = rows[0].len();
    let mut sums = vec![vec![0.0; width]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (row, &cluster) in rows.iter().zip(assignments) {
        counts[cluster] += 1;
        for (sum, value) in sums[cluster].iter_mut().zip(row) {
            *sum += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), old)| {
            if count == 0 {
                // empty cluster keeps its previous centre
                old.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}
