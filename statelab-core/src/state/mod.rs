//! Unsupervised market-state identification.
//!
//! Pipeline per run:
//! 1. standardize the feature matrix on the analysis window only
//! 2. project onto the leading principal components
//! 3. cluster with seeded K-means
//! 4. summarize each cluster by its centroid in original feature units
//!
//! Cluster ids are canonicalized by ascending centroid volatility so the
//! same market produces the same numbering across runs and seeds.

pub mod kmeans;
pub mod labels;
pub mod pca;
pub mod scaler;

pub use pca::PcaDiagnostics;

use tracing::{debug, warn};

use crate::config::{StateConfig, MAX_STATES, MIN_STATES};
use crate::domain::{FeatureVector, State, FEATURE_COUNT};
use crate::error::EngineError;
use crate::features::FeatureMatrix;
use crate::math::mean;
use crate::rng::SeedHierarchy;

use self::kmeans::{distance, KMeans};
use self::pca::Pca;
use self::scaler::Standardizer;

/// Result of one identification run. Superseded, never mutated, by the next run.
#[derive(Debug, Clone, PartialEq)]
pub struct StateModel {
    /// Bar index of the first assigned row.
    pub start_index: usize,
    /// States ordered by `state_id`.
    pub states: Vec<State>,
    /// One `state_id` per feature-matrix row.
    pub assignments: Vec<usize>,
    /// True when the feature matrix could not be separated and a single
    /// zero-confidence state was substituted.
    pub degenerate: bool,
    pub pca: Option<PcaDiagnostics>,
    pub inertia: f64,
}

impl StateModel {
    pub fn state(&self, state_id: usize) -> Option<&State> {
        self.states.get(state_id)
    }

    pub fn state_for_bar(&self, bar_index: usize) -> Option<&State> {
        let row = bar_index.checked_sub(self.start_index)?;
        self.assignments.get(row).and_then(|&id| self.state(id))
    }

    /// State of the most recent assigned bar.
    pub fn current_state(&self) -> Option<&State> {
        self.assignments.last().and_then(|&id| self.state(id))
    }

    /// Per-bar state ids aligned with the input bars; `None` during warm-up.
    pub fn timeline(&self, bar_count: usize) -> Vec<Option<usize>> {
        (0..bar_count)
            .map(|i| {
                i.checked_sub(self.start_index)
                    .and_then(|row| self.assignments.get(row).copied())
            })
            .collect()
    }

    pub fn transition_count(&self) -> usize {
        self.assignments.windows(2).filter(|w| w[0] != w[1]).count()
    }
}

/// Clusters feature rows into market states.
#[derive(Debug, Clone)]
pub struct StateIdentifier {
    config: StateConfig,
    seeds: SeedHierarchy,
}

impl StateIdentifier {
    pub fn new(config: &StateConfig, seed: u64) -> Self {
        Self {
            config: config.clone(),
            seeds: SeedHierarchy::new(seed),
        }
    }

    pub fn identify(&self, matrix: &FeatureMatrix, n_states: usize) -> Result<StateModel, EngineError> {
        if !(MIN_STATES..=MAX_STATES).contains(&n_states) {
            return Err(EngineError::config(format!(
                "num_states must be in [{MIN_STATES}, {MAX_STATES}], got {n_states}"
            )));
        }
        if matrix.len() < n_states {
            return Err(EngineError::InsufficientData {
                required: matrix.start_index + n_states,
                actual: matrix.start_index + matrix.len(),
            });
        }

        let raw = matrix.to_arrays();
        let window_volatility = mean(&raw.iter().map(|r| r[0]).collect::<Vec<_>>());

        match self.cluster(&raw, n_states, window_volatility, matrix.start_index) {
            Ok(model) => Ok(model),
            Err(EngineError::NumericInstability(reason)) => {
                warn!(%reason, rows = raw.len(), "degenerate feature matrix, using a single state");
                Ok(degenerate_model(&raw, window_volatility, matrix.start_index))
            }
            Err(e) => Err(e),
        }
    }

    fn cluster(
        &self,
        raw: &[[f64; FEATURE_COUNT]],
        n_states: usize,
        window_volatility: f64,
        start_index: usize,
    ) -> Result<StateModel, EngineError> {
        let scaler = Standardizer::fit(raw)?;
        let scaled = scaler.transform_all(raw);
        let pca = Pca::fit(&scaled, &self.config.components)?;
        let projected = pca.project_all(&scaled);

        let fit = KMeans::new(
            n_states,
            self.config.max_iterations,
            self.config.restarts,
            self.config.tolerance,
        )
        .fit(&projected, &self.seeds);

        // Group members; clusters that ended empty are dropped.
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_states];
        for (row, &c) in fit.assignments.iter().enumerate() {
            members[c].push(row);
        }
        let clusters: Vec<Cluster> = members
            .into_iter()
            .enumerate()
            .filter(|(_, m)| !m.is_empty())
            .map(|(index, rows)| Cluster::new(index, rows, raw, &projected))
            .collect();
        if clusters.len() < n_states {
            warn!(requested = n_states, found = clusters.len(), "fewer non-empty clusters than requested");
        }

        let confidences = self.cohesion(&clusters, raw.len());

        let mut order: Vec<usize> = (0..clusters.len()).collect();
        order.sort_by(|&a, &b| {
            let (ca, cb) = (&clusters[a].centroid, &clusters[b].centroid);
            ca.volatility
                .total_cmp(&cb.volatility)
                .then(ca.trend_strength.total_cmp(&cb.trend_strength))
                .then(clusters[a].index.cmp(&clusters[b].index))
        });

        let mut canonical = vec![0usize; n_states];
        for (new_id, &pos) in order.iter().enumerate() {
            canonical[clusters[pos].index] = new_id;
        }
        let assignments: Vec<usize> = fit.assignments.iter().map(|&c| canonical[c]).collect();

        let centroids: Vec<FeatureVector> = order.iter().map(|&p| clusters[p].centroid).collect();
        let characteristics = labels::characterize(&centroids, window_volatility);

        let total = raw.len() as f64;
        let states: Vec<State> = order
            .iter()
            .zip(characteristics)
            .enumerate()
            .map(|(state_id, (&pos, characteristics))| {
                let cluster = &clusters[pos];
                State {
                    state_id,
                    centroid: cluster.centroid,
                    characteristics,
                    confidence: confidences[pos],
                    member_count: cluster.rows.len(),
                    member_fraction: cluster.rows.len() as f64 / total,
                    component_means: cluster.component_means.clone(),
                }
            })
            .collect();

        debug!(
            states = states.len(),
            inertia = fit.inertia,
            iterations = fit.iterations,
            "identified market states"
        );

        Ok(StateModel {
            start_index,
            states,
            assignments,
            degenerate: false,
            pca: Some(pca.diagnostics()),
            inertia: fit.inertia,
        })
    }

    /// Confidence per cluster: `1 / (1 + a / b)` where `a` is the mean member
    /// distance to the cluster centre and `b` the distance to the nearest
    /// other centre, both in clustering space.
    fn cohesion(&self, clusters: &[Cluster], total_rows: usize) -> Vec<f64> {
        clusters
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let b = clusters
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, o)| distance(&c.component_means, &o.component_means))
                    .fold(f64::INFINITY, f64::min);
                let mut confidence = if b.is_finite() && b > 0.0 {
                    1.0 / (1.0 + c.spread / b)
                } else {
                    0.0
                };
                let fraction = c.rows.len() as f64 / total_rows as f64;
                if fraction < self.config.min_cluster_fraction {
                    warn!(
                        cluster = c.index,
                        members = c.rows.len(),
                        fraction,
                        "sparse cluster, confidence floored"
                    );
                    confidence = confidence.min(self.config.sparse_cluster_confidence);
                }
                confidence.clamp(0.0, 1.0)
            })
            .collect()
    }
}

/// Convenience wrapper over [`StateIdentifier`].
pub fn identify_states(
    matrix: &FeatureMatrix,
    n_states: usize,
    config: &StateConfig,
    seed: u64,
) -> Result<StateModel, EngineError> {
    StateIdentifier::new(config, seed).identify(matrix, n_states)
}

struct Cluster {
    index: usize,
    rows: Vec<usize>,
    centroid: FeatureVector,
    component_means: Vec<f64>,
    spread: f64,
}

impl Cluster {
    fn new(index: usize, rows: Vec<usize>, raw: &[[f64; FEATURE_COUNT]], projected: &[Vec<f64>]) -> Self {
        let n = rows.len() as f64;
        let mut centroid = [0.0; FEATURE_COUNT];
        for &r in &rows {
            for (c, v) in centroid.iter_mut().zip(&raw[r]) {
                *c += v / n;
            }
        }
        let dim = projected.first().map_or(0, Vec::len);
        let mut component_means = vec![0.0; dim];
        for &r in &rows {
            for (c, v) in component_means.iter_mut().zip(&projected[r]) {
                *c += v / n;
            }
        }
        let spread = rows
            .iter()
            .map(|&r| distance(&projected[r], &component_means))
            .sum::<f64>()
            / n;
        Self {
            index,
            rows,
            centroid: FeatureVector::from_array(centroid),
            component_means,
            spread,
        }
    }
}

fn degenerate_model(raw: &[[f64; FEATURE_COUNT]], window_volatility: f64, start_index: usize) -> StateModel {
    let n = raw.len() as f64;
    let mut centroid = [0.0; FEATURE_COUNT];
    for row in raw {
        for (c, v) in centroid.iter_mut().zip(row) {
            *c += v / n;
        }
    }
    let centroid = FeatureVector::from_array(centroid);
    let mut characteristics = labels::characterize(&[centroid], window_volatility);
    let characteristics = characteristics.remove(0);
    StateModel {
        start_index,
        states: vec![State {
            state_id: 0,
            centroid,
            characteristics,
            confidence: 0.0,
            member_count: raw.len(),
            member_fraction: 1.0,
            component_means: Vec::new(),
        }],
        assignments: vec![0; raw.len()],
        degenerate: true,
        pca: None,
        inertia: 0.0,
    }
}
