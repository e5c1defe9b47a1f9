//! Signal — the engine's per-bar output value object.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::indicator::IndicatorKind;
use super::state::State;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
            SignalType::Hold => "HOLD",
        }
    }
}

/// Composite directional signal for one bar.
///
/// Invariants: `composite_score` in [-1, 1], `confidence` in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: NaiveDateTime,
    pub bar_index: usize,
    pub signal_type: SignalType,
    pub composite_score: f64,
    pub confidence: f64,
    /// Indicators that cast a non-neutral vote.
    pub contributing_indicators: BTreeSet<IndicatorKind>,
    pub state_context: State,
}
