//! Indicator engine: RSI, MACD, Stochastic, Bollinger Bands.
//!
//! Indicators are pure functions: bar history in, numeric series out.
//! Every output series has exactly one entry per bar. Warm-up entries are
//! `f64::NAN` internally and surface as `None` (or JSON `null`), never as zero.
//!
//! No indicator value at bar t may depend on data from bar t+1 or later.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use bollinger::{Bollinger, BollingerOutput};
pub use ema::ema_of_series;
pub use macd::{Macd, MacdOutput};
pub use rsi::Rsi;
pub use sma::sma_of_series;
pub use stochastic::Stochastic;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::IndicatorConfig;
use crate::domain::{Bar, IndicatorKind};

/// Trait for indicators.
///
/// Multi-output indicators (MACD, Stochastic, Bollinger) return one entry
/// per output series, keyed by `SeriesKey`.
pub trait Indicator: Send + Sync {
    fn kind(&self) -> IndicatorKind;

    /// Index of the first bar that can carry a value for the primary series.
    fn lookback(&self) -> usize;

    /// Compute every output series for the full bar history.
    fn compute(&self, bars: &[Bar]) -> Vec<(SeriesKey, Vec<f64>)>;
}

/// Name of one output series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKey {
    Rsi,
    Macd,
    MacdSignal,
    MacdHist,
    StochK,
    StochD,
    BbUpper,
    BbMid,
    BbLower,
}

impl SeriesKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKey::Rsi => "rsi",
            SeriesKey::Macd => "macd",
            SeriesKey::MacdSignal => "macd_signal",
            SeriesKey::MacdHist => "macd_hist",
            SeriesKey::StochK => "stoch_k",
            SeriesKey::StochD => "stoch_d",
            SeriesKey::BbUpper => "bb_upper",
            SeriesKey::BbMid => "bb_mid",
            SeriesKey::BbLower => "bb_lower",
        }
    }
}

/// Container for precomputed indicator series.
///
/// Built once per analysis call, then queried by bar index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndicatorSeries {
    bar_count: usize,
    series: BTreeMap<SeriesKey, Vec<f64>>,
}

impl IndicatorSeries {
    pub fn new(bar_count: usize) -> Self {
        Self {
            bar_count,
            series: BTreeMap::new(),
        }
    }

    /// Insert a named series. Its length must match the bar count.
    pub fn insert(&mut self, key: SeriesKey, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.bar_count, "series {key:?} misaligned");
        self.series.insert(key, values);
    }

    /// Value at a bar index, or `None` if undefined (warm-up) or out of range.
    pub fn get(&self, key: SeriesKey, bar_index: usize) -> Option<f64> {
        self.series
            .get(&key)
            .and_then(|v| v.get(bar_index).copied())
            .filter(|v| !v.is_nan())
    }

    /// Full series, warm-up entries as NaN.
    pub fn get_series(&self, key: SeriesKey) -> Option<&[f64]> {
        self.series.get(&key).map(|v| v.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = SeriesKey> + '_ {
        self.series.keys().copied()
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    /// Number of series stored.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Build the concrete indicator for one configuration entry.
pub fn create_indicator(config: &IndicatorConfig) -> Box<dyn Indicator> {
    match config {
        IndicatorConfig::Rsi(p) => Box::new(Rsi::from_params(p)),
        IndicatorConfig::Macd(p) => Box::new(Macd::from_params(p)),
        IndicatorConfig::Stochastic(p) => Box::new(Stochastic::from_params(p)),
        IndicatorConfig::Bollinger(p) => Box::new(Bollinger::from_params(p)),
    }
}

/// Computes every requested indicator over a bar series.
pub struct IndicatorEngine {
    indicators: Vec<Box<dyn Indicator>>,
}

impl IndicatorEngine {
    /// Configurations are assumed validated (see `AnalysisConfig::validate`).
    pub fn new(configs: &[IndicatorConfig]) -> Self {
        Self {
            indicators: configs.iter().map(create_indicator).collect(),
        }
    }

    /// Largest lookback across enabled indicators.
    pub fn max_lookback(&self) -> usize {
        self.indicators.iter().map(|i| i.lookback()).max().unwrap_or(0)
    }

    /// Compute all series. Short inputs produce fully-undefined series, not errors.
    pub fn compute(&self, bars: &[Bar]) -> IndicatorSeries {
        let mut out = IndicatorSeries::new(bars.len());
        for indicator in &self.indicators {
            if bars.len() <= indicator.lookback() {
                debug!(
                    indicator = %indicator.kind(),
                    bars = bars.len(),
                    lookback = indicator.lookback(),
                    "not enough bars; series left undefined"
                );
            }
            for (key, values) in indicator.compute(bars) {
                out.insert(key, values);
            }
        }
        out
    }
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLCV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
