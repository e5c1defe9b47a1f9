//! Bollinger Bands — moving average +/- standard deviation multiplier.
//!
//! - Middle: SMA(close, period)
//! - Upper: middle + num_std * stddev(close, period)
//! - Lower: middle - num_std * stddev(close, period)
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

use super::{Indicator, SeriesKey};
use crate::config::BollingerParams;
use crate::domain::{Bar, IndicatorKind};

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    num_std: f64,
}

/// The three bands, each aligned with the input bars.
#[derive(Debug, Clone)]
pub struct BollingerOutput {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

impl Bollinger {
    pub fn new(period: usize, num_std: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        Self { period, num_std }
    }

    pub fn from_params(params: &BollingerParams) -> Self {
        Self::new(params.period, params.num_std)
    }

    pub fn compute_series(&self, closes: &[f64]) -> BollingerOutput {
        let n = closes.len();
        let mut out = BollingerOutput {
            upper: vec![f64::NAN; n],
            middle: vec![f64::NAN; n],
            lower: vec![f64::NAN; n],
        };

        if n < self.period {
            return out;
        }

        for i in (self.period - 1)..n {
            let window = &closes[i + 1 - self.period..=i];
            if window.iter().any(|c| c.is_nan()) {
                continue;
            }

            let mean = window.iter().sum::<f64>() / self.period as f64;
            let variance = window
                .iter()
                .map(|c| {
                    let diff = c - mean;
                    diff * diff
                })
                .sum::<f64>()
                / self.period as f64;
            let stddev = variance.sqrt();

            out.middle[i] = mean;
            out.upper[i] = mean + self.num_std * stddev;
            out.lower[i] = mean - self.num_std * stddev;
        }

        out
    }
}

impl Indicator for Bollinger {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Bollinger
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<(SeriesKey, Vec<f64>)> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let out = self.compute_series(&closes);
        vec![
            (SeriesKey::BbUpper, out.upper),
            (SeriesKey::BbMid, out.middle),
            (SeriesKey::BbLower, out.lower),
        ]
    }
}
