//! Per-bar feature vector used for market-state inference.

use serde::{Deserialize, Serialize};

/// Dimensionality of every feature vector.
pub const FEATURE_COUNT: usize = 4;

/// Column names, in `to_array()` order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "volatility",
    "trend_strength",
    "volume_ratio",
    "return_dispersion",
];

/// Four market statistics for one bar, all finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Rolling standard deviation of simple returns.
    pub volatility: f64,
    /// Volatility-normalized momentum confirmed by MA crossover, in [-1, 1].
    pub trend_strength: f64,
    /// Current volume over rolling mean volume.
    pub volume_ratio: f64,
    /// Interquartile range of rolling returns.
    pub return_dispersion: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.volatility,
            self.trend_strength,
            self.volume_ratio,
            self.return_dispersion,
        ]
    }

    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            volatility: values[0],
            trend_strength: values[1],
            volume_ratio: values[2],
            return_dispersion: values[3],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}
