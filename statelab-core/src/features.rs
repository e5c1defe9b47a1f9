//! Feature extraction for market-state inference.
//!
//! Every feature uses the same trailing window `w`, so row t of the matrix
//! summarizes returns `r[t-w+1..=t]`. Returns start at bar 1, which makes
//! bar `w` the first bar with a full window; earlier bars are dropped from
//! the matrix rather than padded.

use tracing::debug;

use crate::config::FeatureConfig;
use crate::domain::{Bar, FeatureVector, FEATURE_COUNT};
use crate::math::{interquartile_range, mean, simple_returns, std_dev};

/// Feature rows aligned with `bars[start_index..]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub start_index: usize,
    pub rows: Vec<FeatureVector>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Bar index for a matrix row.
    pub fn bar_index(&self, row: usize) -> usize {
        self.start_index + row
    }

    /// Feature row for a bar index, if the bar is past warm-up.
    pub fn row_for_bar(&self, bar_index: usize) -> Option<&FeatureVector> {
        bar_index
            .checked_sub(self.start_index)
            .and_then(|row| self.rows.get(row))
    }

    pub fn to_arrays(&self) -> Vec<[f64; FEATURE_COUNT]> {
        self.rows.iter().map(FeatureVector::to_array).collect()
    }
}

#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    window: usize,
    fast_window: usize,
}

impl FeatureExtractor {
    pub fn new(config: &FeatureConfig) -> Self {
        assert!(config.window >= 2, "feature window must be >= 2");
        assert!(
            config.fast_window >= 1 && config.fast_window < config.window,
            "fast_window must be in [1, window)"
        );
        Self {
            window: config.window,
            fast_window: config.fast_window,
        }
    }

    /// Index of the first bar that receives a feature vector.
    pub fn warmup(&self) -> usize {
        self.window
    }

    pub fn extract(&self, bars: &[Bar]) -> FeatureMatrix {
        let w = self.window;
        let n = bars.len();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let returns = simple_returns(&closes);

        let mut rows = Vec::with_capacity(n.saturating_sub(w));
        for t in w..n {
            let window_returns = &returns[t + 1 - w..=t];
            let volatility = std_dev(window_returns, 1);

            let trend_strength = self.trend_strength(&closes, t, volatility);

            let mean_volume = mean(&volumes[t + 1 - w..=t]);
            let volume_ratio = if mean_volume > 0.0 {
                volumes[t] / mean_volume
            } else {
                1.0
            };

            let return_dispersion = interquartile_range(window_returns);

            rows.push(FeatureVector {
                volatility: finite_or_zero(volatility),
                trend_strength: finite_or_zero(trend_strength),
                volume_ratio: finite_or_zero(volume_ratio),
                return_dispersion: finite_or_zero(return_dispersion),
            });
        }

        debug!(rows = rows.len(), window = w, "extracted feature matrix");
        FeatureMatrix {
            start_index: w,
            rows,
        }
    }

    /// Momentum over the window scaled by volatility, squashed into [-1, 1].
    ///
    /// A fast/slow moving-average crossover that disagrees with the
    /// momentum direction halves the reading.
    fn trend_strength(&self, closes: &[f64], t: usize, volatility: f64) -> f64 {
        let w = self.window;
        let momentum = closes[t] / closes[t - w] - 1.0;
        let scale = volatility * (w as f64).sqrt();

        let base = if scale > f64::EPSILON {
            (momentum / scale).tanh()
        } else if momentum == 0.0 {
            0.0
        } else {
            momentum.signum()
        };

        let fast = mean(&closes[t + 1 - self.fast_window..=t]);
        let slow = mean(&closes[t + 1 - w..=t]);
        let crossover = fast - slow;

        let confirmed = crossover != 0.0 && crossover.signum() == base.signum();
        if confirmed {
            base
        } else {
            base * 0.5
        }
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
