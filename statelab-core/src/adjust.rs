//! State-conditioned threshold and weight scaling.
//!
//! Each (indicator, threshold|weight) pair maps one state statistic to a
//! scale factor through a named [`ScaleTransform`]. Threshold scales read
//! volatility (`relative_volatility - 1`), weight scales read trend
//! (`|trend_strength|`). Every factor is clamped to `[min_scale, max_scale]`
//! so thresholds never collapse to zero or flip sign.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{IndicatorKind, State, StateCharacteristics};
use crate::error::EngineError;

/// A pure, monotone map from a state statistic to a scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScaleTransform {
    /// Always 1.
    Constant,
    /// `1 + slope * x`; non-decreasing in `x`.
    Linear { slope: f64 },
    /// `1 / (1 + slope * x)`; non-increasing in `x`.
    InverseLinear { slope: f64 },
}

impl ScaleTransform {
    /// Evaluate and clamp to `[min, max]`.
    ///
    /// A non-positive inverse denominator is the limit toward `+inf`, so it
    /// yields `max`.
    pub fn apply(&self, x: f64, min: f64, max: f64) -> f64 {
        let raw = match *self {
            ScaleTransform::Constant => 1.0,
            ScaleTransform::Linear { slope } => 1.0 + slope * x,
            ScaleTransform::InverseLinear { slope } => {
                let denom = 1.0 + slope * x;
                if denom <= 0.0 {
                    f64::INFINITY
                } else {
                    1.0 / denom
                }
            }
        };
        if raw.is_nan() {
            return 1.0_f64.clamp(min, max);
        }
        raw.clamp(min, max)
    }

    fn slope(&self) -> f64 {
        match *self {
            ScaleTransform::Constant => 0.0,
            ScaleTransform::Linear { slope } | ScaleTransform::InverseLinear { slope } => slope,
        }
    }
}

/// Transforms for one indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformPair {
    pub threshold: ScaleTransform,
    pub weight: ScaleTransform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentConfig {
    pub rsi: TransformPair,
    pub macd: TransformPair,
    pub stochastic: TransformPair,
    pub bollinger: TransformPair,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            // Oscillator bands widen with volatility; oscillators matter more
            // when the trend is weak.
            rsi: TransformPair {
                threshold: ScaleTransform::Linear { slope: 0.5 },
                weight: ScaleTransform::InverseLinear { slope: 1.0 },
            },
            macd: TransformPair {
                threshold: ScaleTransform::Linear { slope: 1.0 },
                weight: ScaleTransform::Linear { slope: 1.0 },
            },
            stochastic: TransformPair {
                threshold: ScaleTransform::Linear { slope: 0.5 },
                weight: ScaleTransform::InverseLinear { slope: 1.0 },
            },
            bollinger: TransformPair {
                threshold: ScaleTransform::Linear { slope: 0.5 },
                weight: ScaleTransform::Linear { slope: 1.0 },
            },
            min_scale: 0.25,
            max_scale: 4.0,
        }
    }
}

impl AdjustmentConfig {
    pub fn pair(&self, kind: IndicatorKind) -> &TransformPair {
        match kind {
            IndicatorKind::Rsi => &self.rsi,
            IndicatorKind::Macd => &self.macd,
            IndicatorKind::Stochastic => &self.stochastic,
            IndicatorKind::Bollinger => &self.bollinger,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let bounded = self.min_scale.is_finite()
            && self.max_scale.is_finite()
            && self.min_scale > 0.0
            && self.min_scale <= 1.0
            && self.max_scale >= 1.0;
        if !bounded {
            return Err(EngineError::config(format!(
                "scale bounds must satisfy 0 < min_scale <= 1 <= max_scale, got [{}, {}]",
                self.min_scale, self.max_scale
            )));
        }
        for kind in IndicatorKind::ALL {
            let pair = self.pair(kind);
            for (role, t) in [("threshold", pair.threshold), ("weight", pair.weight)] {
                let slope = t.slope();
                if !slope.is_finite() || slope < 0.0 {
                    return Err(EngineError::config(format!(
                        "{kind} {role} transform slope must be a finite value >= 0, got {slope}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Scale factors for one indicator in one state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactors {
    pub threshold_scale: f64,
    pub weight_scale: f64,
}

impl ScaleFactors {
    pub const IDENTITY: ScaleFactors = ScaleFactors {
        threshold_scale: 1.0,
        weight_scale: 1.0,
    };
}

/// Factors for every indicator kind, derived from one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateAdjustment {
    pub state_id: usize,
    pub factors: BTreeMap<IndicatorKind, ScaleFactors>,
}

impl StateAdjustment {
    pub fn get(&self, kind: IndicatorKind) -> ScaleFactors {
        self.factors.get(&kind).copied().unwrap_or(ScaleFactors::IDENTITY)
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdAdjuster {
    config: AdjustmentConfig,
}

impl ThresholdAdjuster {
    pub fn new(config: &AdjustmentConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn factors(&self, kind: IndicatorKind, chars: &StateCharacteristics) -> ScaleFactors {
        let pair = self.config.pair(kind);
        let (lo, hi) = (self.config.min_scale, self.config.max_scale);
        let x_vol = chars.relative_volatility - 1.0;
        let x_trend = chars.trend_strength.abs();
        ScaleFactors {
            threshold_scale: pair.threshold.apply(x_vol, lo, hi),
            weight_scale: pair.weight.apply(x_trend, lo, hi),
        }
    }

    pub fn adjust(&self, state: &State) -> StateAdjustment {
        let factors = IndicatorKind::ALL
            .into_iter()
            .map(|kind| (kind, self.factors(kind, &state.characteristics)))
            .collect();
        StateAdjustment {
            state_id: state.state_id,
            factors,
        }
    }
}

/// Scale an oscillator band around its midpoint of 50.
///
/// A scale above 1 pushes both edges outward (fewer votes), below 1 pulls
/// them inward. Results stay inside [0, 50] and [50, 100].
pub fn scale_band(oversold: f64, overbought: f64, scale: f64) -> (f64, f64) {
    let lower = (50.0 - (50.0 - oversold) * scale).clamp(0.0, 50.0);
    let upper = (50.0 + (overbought - 50.0) * scale).clamp(50.0, 100.0);
    (lower, upper)
}
