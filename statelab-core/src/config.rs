//! Analysis configuration.
//!
//! One immutable, explicitly-typed struct tree replaces ad-hoc dictionaries.
//! Built once (defaults, TOML, or JSON), validated once, then passed by
//! reference through every stage of the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::adjust::AdjustmentConfig;
use crate::domain::IndicatorKind;
use crate::error::EngineError;

/// Smallest and largest number of market states a run may request.
pub const MIN_STATES: usize = 2;
pub const MAX_STATES: usize = 5;

// ─── Indicator parameters ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiParams {
    pub window: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub weight: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            window: 14,
            oversold: 30.0,
            overbought: 70.0,
            weight: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    /// Vote threshold in standard deviations of the trailing MACD line.
    pub threshold_std: f64,
    pub weight: f64,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
            threshold_std: 1.5,
            weight: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StochasticParams {
    pub k_period: usize,
    pub d_period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub weight: f64,
}

impl Default for StochasticParams {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
            oversold: 20.0,
            overbought: 80.0,
            weight: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerParams {
    pub period: usize,
    pub num_std: f64,
    pub weight: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            period: 20,
            num_std: 2.0,
            weight: 0.15,
        }
    }
}

/// One enabled indicator and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorConfig {
    Rsi(RsiParams),
    Macd(MacdParams),
    Stochastic(StochasticParams),
    Bollinger(BollingerParams),
}

impl IndicatorConfig {
    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorConfig::Rsi(_) => IndicatorKind::Rsi,
            IndicatorConfig::Macd(_) => IndicatorKind::Macd,
            IndicatorConfig::Stochastic(_) => IndicatorKind::Stochastic,
            IndicatorConfig::Bollinger(_) => IndicatorKind::Bollinger,
        }
    }

    /// Base weight before state scaling.
    pub fn weight(&self) -> f64 {
        match self {
            IndicatorConfig::Rsi(p) => p.weight,
            IndicatorConfig::Macd(p) => p.weight,
            IndicatorConfig::Stochastic(p) => p.weight,
            IndicatorConfig::Bollinger(p) => p.weight,
        }
    }

    /// Bars needed before the primary series produces its first value.
    pub fn warmup_bars(&self) -> usize {
        match self {
            IndicatorConfig::Rsi(p) => p.window + 1,
            IndicatorConfig::Macd(p) => p.slow,
            IndicatorConfig::Stochastic(p) => p.k_period,
            IndicatorConfig::Bollinger(p) => p.period,
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        let kind = self.kind();
        let weight = self.weight();
        if !weight.is_finite() || weight < 0.0 {
            return Err(EngineError::config(format!(
                "{kind} weight must be a finite value >= 0, got {weight}"
            )));
        }
        match self {
            IndicatorConfig::Rsi(p) => {
                require_window(kind, "window", p.window)?;
                require_band(kind, p.oversold, p.overbought)
            }
            IndicatorConfig::Macd(p) => {
                require_window(kind, "fast", p.fast)?;
                require_window(kind, "slow", p.slow)?;
                require_window(kind, "signal", p.signal)?;
                if p.fast >= p.slow {
                    return Err(EngineError::config(format!(
                        "MACD fast period {} must be shorter than slow period {}",
                        p.fast, p.slow
                    )));
                }
                if !p.threshold_std.is_finite() || p.threshold_std < 0.0 {
                    return Err(EngineError::config("MACD threshold_std must be >= 0"));
                }
                Ok(())
            }
            IndicatorConfig::Stochastic(p) => {
                require_window(kind, "k_period", p.k_period)?;
                require_window(kind, "d_period", p.d_period)?;
                require_band(kind, p.oversold, p.overbought)
            }
            IndicatorConfig::Bollinger(p) => {
                require_window(kind, "period", p.period)?;
                if !p.num_std.is_finite() || p.num_std <= 0.0 {
                    return Err(EngineError::config("Bollinger num_std must be > 0"));
                }
                Ok(())
            }
        }
    }
}

fn require_window(kind: IndicatorKind, field: &str, value: usize) -> Result<(), EngineError> {
    if value == 0 {
        return Err(EngineError::config(format!("{kind} {field} must be >= 1")));
    }
    Ok(())
}

fn require_band(kind: IndicatorKind, oversold: f64, overbought: f64) -> Result<(), EngineError> {
    let ordered = (0.0..=100.0).contains(&oversold)
        && (0.0..=100.0).contains(&overbought)
        && oversold < overbought;
    if !ordered {
        return Err(EngineError::config(format!(
            "{kind} thresholds must satisfy 0 <= oversold < overbought <= 100, got {oversold}/{overbought}"
        )));
    }
    Ok(())
}

fn default_indicators() -> Vec<IndicatorConfig> {
    vec![
        IndicatorConfig::Rsi(RsiParams::default()),
        IndicatorConfig::Macd(MacdParams::default()),
        IndicatorConfig::Stochastic(StochasticParams::default()),
        IndicatorConfig::Bollinger(BollingerParams::default()),
    ]
}

// ─── Feature / state / signal sections ──────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Shared rolling window for all four features.
    pub window: usize,
    /// Fast moving average used for the crossover confirmation.
    pub fast_window: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window: 20,
            fast_window: 5,
        }
    }
}

/// How many principal components feed the clustering step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ComponentSelection {
    /// Keep exactly `count` components.
    Fixed { count: usize },
    /// Keep the fewest components whose cumulative explained variance reaches `threshold`.
    Variance { threshold: f64 },
}

impl Default for ComponentSelection {
    fn default() -> Self {
        ComponentSelection::Fixed { count: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub components: ComponentSelection,
    pub max_iterations: usize,
    /// Independent k-means++ initializations; the lowest-inertia run wins.
    pub restarts: usize,
    /// Stop when no centroid moves further than this.
    pub tolerance: f64,
    /// Clusters holding fewer than this share of samples are "sparse".
    pub min_cluster_fraction: f64,
    /// Confidence ceiling applied to sparse clusters.
    pub sparse_cluster_confidence: f64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            components: ComponentSelection::default(),
            max_iterations: 300,
            restarts: 10,
            tolerance: 1e-8,
            min_cluster_fraction: 0.05,
            sparse_cluster_confidence: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub min_signal_strength: f64,
    pub min_confidence: f64,
    /// Trailing bars used for the MACD dispersion threshold.
    pub threshold_lookback: usize,
    /// Volume ratio at which volume stops discounting confidence.
    pub full_volume_ratio: f64,
    /// Reconstruct a signal for every state-assigned bar, not just the last.
    pub include_history: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_signal_strength: 0.1,
            min_confidence: 0.5,
            threshold_lookback: 50,
            full_volume_ratio: 1.0,
            include_history: true,
        }
    }
}

// ─── Top level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub num_states: usize,
    /// Seed for clustering initialization. Same seed + same input = same states.
    pub seed: u64,
    pub indicators: Vec<IndicatorConfig>,
    pub features: FeatureConfig,
    pub states: StateConfig,
    pub adjustment: AdjustmentConfig,
    pub signal: SignalConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            num_states: 3,
            seed: 42,
            indicators: default_indicators(),
            features: FeatureConfig::default(),
            states: StateConfig::default(),
            adjustment: AdjustmentConfig::default(),
            signal: SignalConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Reject bad configuration before any computation begins.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(MIN_STATES..=MAX_STATES).contains(&self.num_states) {
            return Err(EngineError::config(format!(
                "num_states must be in [{MIN_STATES}, {MAX_STATES}], got {}",
                self.num_states
            )));
        }

        if self.indicators.is_empty() {
            return Err(EngineError::config("indicator set is empty"));
        }
        let mut seen = BTreeSet::new();
        for indicator in &self.indicators {
            if !seen.insert(indicator.kind()) {
                return Err(EngineError::config(format!(
                    "indicator {} configured more than once",
                    indicator.kind()
                )));
            }
            indicator.validate()?;
        }

        if self.features.window < 2 {
            return Err(EngineError::config("feature window must be >= 2"));
        }
        if self.features.fast_window == 0 || self.features.fast_window >= self.features.window {
            return Err(EngineError::config(
                "feature fast_window must be in [1, window)",
            ));
        }

        let states = &self.states;
        match states.components {
            ComponentSelection::Fixed { count: 0 } => {
                return Err(EngineError::config("PCA component count must be >= 1"));
            }
            ComponentSelection::Variance { threshold } if !(threshold > 0.0 && threshold <= 1.0) => {
                return Err(EngineError::config(
                    "PCA variance threshold must be in (0, 1]",
                ));
            }
            _ => {}
        }
        if states.max_iterations == 0 || states.restarts == 0 {
            return Err(EngineError::config(
                "k-means max_iterations and restarts must be >= 1",
            ));
        }
        if !states.tolerance.is_finite() || states.tolerance < 0.0 {
            return Err(EngineError::config("k-means tolerance must be >= 0"));
        }
        for (name, value) in [
            ("min_cluster_fraction", states.min_cluster_fraction),
            ("sparse_cluster_confidence", states.sparse_cluster_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::config(format!("{name} must be in [0, 1]")));
            }
        }

        self.adjustment.validate()?;

        let signal = &self.signal;
        for (name, value) in [
            ("min_signal_strength", signal.min_signal_strength),
            ("min_confidence", signal.min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::config(format!("{name} must be in [0, 1]")));
            }
        }
        if signal.threshold_lookback < 2 {
            return Err(EngineError::config("threshold_lookback must be >= 2"));
        }
        if !(signal.full_volume_ratio.is_finite() && signal.full_volume_ratio > 0.0) {
            return Err(EngineError::config("full_volume_ratio must be > 0"));
        }

        Ok(())
    }

    /// Parameters for one indicator kind, if it is enabled.
    pub fn indicator(&self, kind: IndicatorKind) -> Option<&IndicatorConfig> {
        self.indicators.iter().find(|c| c.kind() == kind)
    }

    /// Smallest bar count the full pipeline accepts.
    ///
    /// Covers the slowest indicator warm-up and leaves at least one
    /// feature row per requested state.
    pub fn required_bars(&self) -> usize {
        let indicator_warmup = self
            .indicators
            .iter()
            .map(IndicatorConfig::warmup_bars)
            .max()
            .unwrap_or(0);
        indicator_warmup.max(self.features.window + self.num_states)
    }

    /// BLAKE3 over the canonical JSON form. Identical configs hash identically.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("AnalysisConfig must serialize");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_states, 3);
        assert_eq!(config.indicators.len(), 4);
    }

    #[test]
    fn default_weights_sum_to_one() {
        let total: f64 = AnalysisConfig::default()
            .indicators
            .iter()
            .map(IndicatorConfig::weight)
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn num_states_out_of_range_rejected() {
        for n in [0, 1, 6, 10] {
            let config = AnalysisConfig {
                num_states: n,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(EngineError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn empty_indicator_set_rejected() {
        let config = AnalysisConfig {
            indicators: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_weight_rejected() {
        let config = AnalysisConfig {
            indicators: vec![IndicatorConfig::Rsi(RsiParams {
                weight: -0.5,
                ..Default::default()
            })],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("weight"));
    }

    #[test]
    fn duplicate_indicator_rejected() {
        let config = AnalysisConfig {
            indicators: vec![
                IndicatorConfig::Rsi(RsiParams::default()),
                IndicatorConfig::Rsi(RsiParams::default()),
            ],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_band_rejected() {
        let config = AnalysisConfig {
            indicators: vec![IndicatorConfig::Stochastic(StochasticParams {
                oversold: 80.0,
                overbought: 20.0,
                ..Default::default()
            })],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn required_bars_covers_feature_window() {
        let config = AnalysisConfig::default();
        // MACD slow (26) dominates features (20 + 3).
        assert_eq!(config.required_bars(), 26);

        let rsi_only = AnalysisConfig {
            indicators: vec![IndicatorConfig::Rsi(RsiParams::default())],
            num_states: 5,
            ..Default::default()
        };
        assert_eq!(rsi_only.required_bars(), 25);
    }

    #[test]
    fn fingerprint_deterministic_and_param_sensitive() {
        let a = AnalysisConfig::default();
        let b = AnalysisConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = AnalysisConfig {
            seed: 7,
            ..Default::default()
        };
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn json_roundtrip_preserves_tagged_indicators() {
        let config = AnalysisConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""type":"macd""#));
        let back: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"num_states": 2, "indicators": [{"type": "rsi", "window": 10}]}"#)
                .unwrap();
        assert_eq!(config.num_states, 2);
        assert_eq!(config.seed, 42);
        match &config.indicators[0] {
            IndicatorConfig::Rsi(p) => {
                assert_eq!(p.window, 10);
                assert_eq!(p.oversold, 30.0);
            }
            other => panic!("expected RSI, got {other:?}"),
        }
    }
}
