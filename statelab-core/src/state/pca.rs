//! Principal component analysis on the standardized feature matrix.
//!
//! With four features the covariance matrix is 4x4, so a cyclic Jacobi
//! eigendecomposition is exact enough and needs no linear-algebra crate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ComponentSelection;
use crate::domain::{FEATURE_COUNT, FEATURE_NAMES};
use crate::error::EngineError;

const JACOBI_MAX_SWEEPS: usize = 100;
const JACOBI_TOLERANCE: f64 = 1e-14;

type Matrix = [[f64; FEATURE_COUNT]; FEATURE_COUNT];

/// Diagnostics reported alongside the state model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaDiagnostics {
    pub n_components: usize,
    /// Share of total variance per retained component.
    pub explained_variance_ratio: Vec<f64>,
    pub cumulative_explained_variance: f64,
    /// One row per retained component, one column per feature.
    pub loadings: Vec<Vec<f64>>,
    pub feature_names: Vec<String>,
    /// Absolute loading of each feature on the first component.
    pub feature_importance: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Pca {
    components: Vec<[f64; FEATURE_COUNT]>,
    explained_variance_ratio: Vec<f64>,
}

impl Pca {
    /// Fit on rows that are already centered (standardized).
    pub fn fit(
        rows: &[[f64; FEATURE_COUNT]],
        selection: &ComponentSelection,
    ) -> Result<Self, EngineError> {
        if rows.len() < 2 {
            return Err(EngineError::NumericInstability(
                "PCA needs at least two rows".into(),
            ));
        }
        let cov = covariance(rows);
        let (values, vectors) = jacobi_eigen(cov)?;

        let mut order: Vec<usize> = (0..FEATURE_COUNT).collect();
        order.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));

        let total: f64 = values.iter().map(|v| v.max(0.0)).sum();
        if total <= f64::EPSILON {
            return Err(EngineError::NumericInstability(
                "feature covariance has no variance".into(),
            ));
        }

        let ratios: Vec<f64> = order.iter().map(|&i| values[i].max(0.0) / total).collect();
        let count = match *selection {
            ComponentSelection::Fixed { count } => count.min(FEATURE_COUNT),
            ComponentSelection::Variance { threshold } => {
                let mut cumulative = 0.0;
                let mut k = FEATURE_COUNT;
                for (i, r) in ratios.iter().enumerate() {
                    cumulative += r;
                    if cumulative >= threshold - 1e-12 {
                        k = i + 1;
                        break;
                    }
                }
                k
            }
        };

        let components: Vec<[f64; FEATURE_COUNT]> = order[..count]
            .iter()
            .map(|&i| {
                let mut v = [0.0; FEATURE_COUNT];
                for (row, slot) in v.iter_mut().enumerate() {
                    *slot = vectors[row][i];
                }
                orient(v)
            })
            .collect();

        debug!(
            components = count,
            ratios = ?&ratios[..count],
            "fitted PCA"
        );

        Ok(Self {
            components,
            explained_variance_ratio: ratios[..count].to_vec(),
        })
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    pub fn project(&self, row: &[f64; FEATURE_COUNT]) -> Vec<f64> {
        self.components
            .iter()
            .map(|c| c.iter().zip(row).map(|(a, b)| a * b).sum())
            .collect()
    }

    pub fn project_all(&self, rows: &[[f64; FEATURE_COUNT]]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.project(r)).collect()
    }

    pub fn diagnostics(&self) -> PcaDiagnostics {
        let feature_importance = self
            .components
            .first()
            .map(|c| c.iter().map(|v| v.abs()).collect())
            .unwrap_or_default();
        PcaDiagnostics {
            n_components: self.components.len(),
            explained_variance_ratio: self.explained_variance_ratio.clone(),
            cumulative_explained_variance: self.explained_variance_ratio.iter().sum(),
            loadings: self.components.iter().map(|c| c.to_vec()).collect(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            feature_importance,
        }
    }
}

fn covariance(rows: &[[f64; FEATURE_COUNT]]) -> Matrix {
    let n = rows.len();
    let mut means = [0.0; FEATURE_COUNT];
    for r in rows {
        for (m, v) in means.iter_mut().zip(r) {
            *m += v;
        }
    }
    for m in &mut means {
        *m /= n as f64;
    }
    let mut cov = [[0.0; FEATURE_COUNT]; FEATURE_COUNT];
    for r in rows {
        for i in 0..FEATURE_COUNT {
            for j in i..FEATURE_COUNT {
                cov[i][j] += (r[i] - means[i]) * (r[j] - means[j]);
            }
        }
    }
    for i in 0..FEATURE_COUNT {
        for j in i..FEATURE_COUNT {
            cov[i][j] /= (n - 1) as f64;
            cov[j][i] = cov[i][j];
        }
    }
    cov
}

/// Eigenvalues and column eigenvectors of a symmetric matrix.
fn jacobi_eigen(mut a: Matrix) -> Result<([f64; FEATURE_COUNT], Matrix), EngineError> {
    let mut v = [[0.0; FEATURE_COUNT]; FEATURE_COUNT];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off: f64 = (0..FEATURE_COUNT)
            .flat_map(|i| (0..FEATURE_COUNT).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a[i][j] * a[i][j])
            .sum();
        if off < JACOBI_TOLERANCE {
            let values = [a[0][0], a[1][1], a[2][2], a[3][3]];
            return Ok((values, v));
        }

        for p in 0..FEATURE_COUNT {
            for q in (p + 1)..FEATURE_COUNT {
                if a[p][q].abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..FEATURE_COUNT {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..FEATURE_COUNT {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let vkp = row[p];
                    let vkq = row[q];
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }

    Err(EngineError::NumericInstability(
        "eigendecomposition did not converge".into(),
    ))
}

/// Flip sign so the largest-magnitude loading is positive.
fn orient(mut v: [f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
    let mut pivot = 0;
    for i in 1..FEATURE_COUNT {
        if v[i].abs() > v[pivot].abs() + 1e-12 {
            pivot = i;
        }
    }
    if v[pivot] < 0.0 {
        for x in &mut v {
            *x = -*x;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    fn correlated_rows() -> Vec<[f64; 4]> {
        // Columns 0 and 1 move together, columns 2 and 3 are small noise.
        (0..50)
            .map(|i| {
                let x = (i as f64 - 24.5) / 10.0;
                let n1 = ((i * 7 % 11) as f64 - 5.0) * 0.01;
                let n2 = ((i * 3 % 13) as f64 - 6.0) * 0.01;
                [x, x + n1, n2, -n1]
            })
            .collect()
    }

    #[test]
    fn jacobi_recovers_diagonal() {
        let mut m = [[0.0; 4]; 4];
        m[0][0] = 3.0;
        m[1][1] = 1.0;
        m[2][2] = 2.0;
        m[3][3] = 0.5;
        let (values, _) = jacobi_eigen(m).unwrap();
        assert_eq!(values, [3.0, 1.0, 2.0, 0.5]);
    }

    #[test]
    fn jacobi_eigenpairs_satisfy_definition() {
        let m = [
            [4.0, 1.0, 0.5, 0.0],
            [1.0, 3.0, 0.2, 0.1],
            [0.5, 0.2, 2.0, 0.3],
            [0.0, 0.1, 0.3, 1.0],
        ];
        let (values, vectors) = jacobi_eigen(m).unwrap();
        for k in 0..4 {
            for i in 0..4 {
                let av: f64 = (0..4).map(|j| m[i][j] * vectors[j][k]).sum();
                assert_approx(av, values[k] * vectors[i][k], 1e-9);
            }
        }
    }

    #[test]
    fn first_component_captures_shared_direction() {
        let pca = Pca::fit(&correlated_rows(), &ComponentSelection::Fixed { count: 2 }).unwrap();
        let diag = pca.diagnostics();
        assert_eq!(diag.n_components, 2);
        assert!(diag.explained_variance_ratio[0] > 0.95);
        assert!(diag.explained_variance_ratio[0] >= diag.explained_variance_ratio[1]);
        assert!(diag.feature_importance[0] > 0.6);
        assert!(diag.feature_importance[1] > 0.6);
        assert!(diag.feature_importance[2] < 0.1);
    }

    #[test]
    fn variance_threshold_selects_minimal_count() {
        let pca = Pca::fit(
            &correlated_rows(),
            &ComponentSelection::Variance { threshold: 0.9 },
        )
        .unwrap();
        assert_eq!(pca.n_components(), 1);

        let all = Pca::fit(
            &correlated_rows(),
            &ComponentSelection::Variance { threshold: 1.0 },
        )
        .unwrap();
        assert!(all.n_components() >= 3);
    }

    #[test]
    fn loadings_are_unit_length_and_oriented() {
        let pca = Pca::fit(&correlated_rows(), &ComponentSelection::Fixed { count: 4 }).unwrap();
        for row in pca.diagnostics().loadings {
            let norm: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert_approx(norm, 1.0, 1e-9);
            let max = row.iter().cloned().fold(0.0_f64, |a, b| if b.abs() > a.abs() { b } else { a });
            assert!(max > 0.0);
        }
    }

    #[test]
    fn zero_matrix_is_numeric_instability() {
        let rows = vec![[0.0; 4]; 10];
        assert!(matches!(
            Pca::fit(&rows, &ComponentSelection::default()),
            Err(EngineError::NumericInstability(_))
        ));
    }
}
