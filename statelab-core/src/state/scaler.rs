//! Column standardization fitted on the analysis window only.

use crate::domain::FEATURE_COUNT;
use crate::error::EngineError;
use crate::math::{mean, std_dev};

/// Relative spread below which a column is treated as constant.
const ZERO_VARIANCE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    means: [f64; FEATURE_COUNT],
    stds: [f64; FEATURE_COUNT],
}

impl Standardizer {
    /// Fit column means and population standard deviations.
    ///
    /// Constant columns map to zero. If every column is constant there is
    /// nothing to cluster on and `NumericInstability` is returned.
    pub fn fit(rows: &[[f64; FEATURE_COUNT]]) -> Result<Self, EngineError> {
        if rows.is_empty() {
            return Err(EngineError::NumericInstability(
                "cannot standardize an empty feature matrix".into(),
            ));
        }
        let mut means = [0.0; FEATURE_COUNT];
        let mut stds = [0.0; FEATURE_COUNT];
        for col in 0..FEATURE_COUNT {
            let column: Vec<f64> = rows.iter().map(|r| r[col]).collect();
            let m = mean(&column);
            let s = std_dev(&column, 0);
            means[col] = m;
            stds[col] = if s > ZERO_VARIANCE_TOLERANCE * (1.0 + m.abs()) {
                s
            } else {
                0.0
            };
        }
        if stds.iter().all(|&s| s == 0.0) {
            return Err(EngineError::NumericInstability(
                "every feature column has zero variance".into(),
            ));
        }
        Ok(Self { means, stds })
    }

    pub fn means(&self) -> &[f64; FEATURE_COUNT] {
        &self.means
    }

    /// Whether a column carried variance in the fitted window.
    pub fn is_active(&self, col: usize) -> bool {
        self.stds[col] > 0.0
    }

    pub fn transform(&self, row: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for col in 0..FEATURE_COUNT {
            if self.stds[col] > 0.0 {
                out[col] = (row[col] - self.means[col]) / self.stds[col];
            }
        }
        out
    }

    pub fn transform_all(&self, rows: &[[f64; FEATURE_COUNT]]) -> Vec<[f64; FEATURE_COUNT]> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}
