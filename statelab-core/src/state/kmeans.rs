//! Seeded K-means with k-means++ initialization and restarts.
//!
//! Each restart draws from its own sub-seed, and the restart with the lowest
//! inertia wins (first one on ties). Identical seed and input therefore give
//! identical assignments.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};

use crate::rng::SeedHierarchy;

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub centroids: Vec<Vec<f64>>,
    pub assignments: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iterations: usize,
    restarts: usize,
    tolerance: f64,
}

impl KMeans {
    pub fn new(k: usize, max_iterations: usize, restarts: usize, tolerance: f64) -> Self {
        Self {
            k,
            max_iterations: max_iterations.max(1),
            restarts: restarts.max(1),
            tolerance,
        }
    }

    /// Cluster `points` (all the same dimension). Requires `points.len() >= k`.
    pub fn fit(&self, points: &[Vec<f64>], seeds: &SeedHierarchy) -> KMeansFit {
        debug_assert!(points.len() >= self.k && self.k > 0);
        let mut best: Option<KMeansFit> = None;
        for restart in 0..self.restarts {
            let mut rng = seeds.rng_for("kmeans", restart as u64);
            let fit = self.fit_once(points, &mut rng);
            debug!(restart, inertia = fit.inertia, iterations = fit.iterations, "k-means restart");
            let better = best.as_ref().map_or(true, |b| fit.inertia < b.inertia);
            if better {
                best = Some(fit);
            }
        }
        best.unwrap_or_else(|| KMeansFit {
            centroids: Vec::new(),
            assignments: Vec::new(),
            inertia: 0.0,
            iterations: 0,
        })
    }

    fn fit_once(&self, points: &[Vec<f64>], rng: &mut StdRng) -> KMeansFit {
        let mut centroids = plus_plus_init(points, self.k, rng);
        let mut assignments = vec![0usize; points.len()];
        let mut iterations = 0;

        for iter in 0..self.max_iterations {
            iterations = iter + 1;
            for (slot, p) in assignments.iter_mut().zip(points) {
                *slot = nearest(p, &centroids).0;
            }

            let mut next = recompute(points, &assignments, self.k, &centroids);
            reseed_empty(points, &mut assignments, &mut next);

            let shift: f64 = centroids
                .iter()
                .zip(&next)
                .map(|(a, b)| squared_distance(a, b))
                .sum();
            centroids = next;
            if shift <= self.tolerance {
                break;
            }
        }

        for (slot, p) in assignments.iter_mut().zip(points) {
            *slot = nearest(p, &centroids).0;
        }
        let inertia = points
            .iter()
            .zip(&assignments)
            .map(|(p, &c)| squared_distance(p, &centroids[c]))
            .sum();

        KMeansFit {
            centroids,
            assignments,
            inertia,
            iterations,
        }
    }
}

pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Index and squared distance of the closest centroid. Lowest index wins ties.
fn nearest(p: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(p, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn plus_plus_init(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());

    let mut d2: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let idx = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (i, &w) in d2.iter().enumerate() {
                if target < w {
                    chosen = i;
                    break;
                }
                target -= w;
            }
            chosen
        } else {
            rng.gen_range(0..points.len())
        };
        let c = points[idx].clone();
        for (slot, p) in d2.iter_mut().zip(points) {
            *slot = slot.min(squared_distance(p, &c));
        }
        centroids.push(c);
    }
    centroids
}

fn recompute(
    points: &[Vec<f64>],
    assignments: &[usize],
    k: usize,
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let dim = points.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![0usize; k];
    for (p, &c) in points.iter().zip(assignments) {
        counts[c] += 1;
        for (s, v) in sums[c].iter_mut().zip(p) {
            *s += v;
        }
    }
    sums.into_iter()
        .zip(&counts)
        .enumerate()
        .map(|(i, (s, &n))| {
            if n == 0 {
                previous[i].clone()
            } else {
                s.into_iter().map(|v| v / n as f64).collect()
            }
        })
        .collect()
}

/// Move each empty cluster onto the point farthest from its own centroid.
fn reseed_empty(points: &[Vec<f64>], assignments: &mut [usize], centroids: &mut [Vec<f64>]) {
    let k = centroids.len();
    let mut counts = vec![0usize; k];
    for &c in assignments.iter() {
        counts[c] += 1;
    }
    for cluster in 0..k {
        if counts[cluster] > 0 {
            continue;
        }
        let farthest = points
            .iter()
            .zip(assignments.iter())
            .enumerate()
            .filter(|(_, (_, c))| counts[**c] > 1)
            .map(|(i, (p, &c))| (i, squared_distance(p, &centroids[c])))
            .fold(None, |acc: Option<(usize, f64)>, (i, d)| match acc {
                Some((_, best)) if best >= d => acc,
                _ => Some((i, d)),
            });
        match farthest {
            Some((i, d)) if d > 0.0 => {
                warn!(cluster, point = i, "empty cluster re-seeded to farthest point");
                counts[assignments[i]] -= 1;
                assignments[i] = cluster;
                counts[cluster] = 1;
                centroids[cluster] = points[i].clone();
            }
            _ => debug!(cluster, "empty cluster left unseeded; points are not separable"),
        }
    }
}
