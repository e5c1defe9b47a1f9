//! Market state — one cluster from a state-identification run.

use serde::{Deserialize, Serialize};

use super::feature::FeatureVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Sideways,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeLevel {
    Below,
    Average,
    Above,
}

/// Human-readable summary of a state plus the numbers the adjuster reads.
///
/// Labels are presentation only. Threshold and weight scaling read
/// `relative_volatility` and `trend_strength`, never the labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateCharacteristics {
    pub volatility: f64,
    pub trend_strength: f64,
    pub volume_ratio: f64,
    pub return_dispersion: f64,
    /// Centroid volatility divided by the mean volatility of the analysis window.
    pub relative_volatility: f64,
    pub volatility_level: VolatilityLevel,
    pub trend_direction: TrendDirection,
    pub volume_level: VolumeLevel,
    pub description: String,
}

/// Immutable result for one cluster. A new identification run produces
/// fresh `State` values; existing ones are never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub state_id: usize,
    /// Mean feature vector of member bars in original (unscaled) units.
    pub centroid: FeatureVector,
    pub characteristics: StateCharacteristics,
    /// Cluster cohesion in [0, 1].
    pub confidence: f64,
    pub member_count: usize,
    pub member_fraction: f64,
    /// Mean member position along each retained principal component.
    pub component_means: Vec<f64>,
}
