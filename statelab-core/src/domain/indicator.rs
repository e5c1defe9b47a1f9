//! Closed set of indicator kinds the engine understands.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorKind {
    Rsi,
    Macd,
    #[serde(rename = "STOCH")]
    Stochastic,
    #[serde(rename = "BB")]
    Bollinger,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 4] = [
        IndicatorKind::Rsi,
        IndicatorKind::Macd,
        IndicatorKind::Stochastic,
        IndicatorKind::Bollinger,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Stochastic => "STOCH",
            IndicatorKind::Bollinger => "BB",
        }
    }

    /// Oscillators vote against extremes; the rest follow the trend.
    pub fn is_oscillator(&self) -> bool {
        matches!(self, IndicatorKind::Rsi | IndicatorKind::Stochastic)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_names_match_display() {
        for kind in IndicatorKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
            let back: IndicatorKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn oscillators() {
        assert!(IndicatorKind::Rsi.is_oscillator());
        assert!(IndicatorKind::Stochastic.is_oscillator());
        assert!(!IndicatorKind::Macd.is_oscillator());
        assert!(!IndicatorKind::Bollinger.is_oscillator());
    }
}
