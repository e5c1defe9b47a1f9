//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: window (the first `window` bars are undefined).
//! Edge cases: avg_loss == 0 → RSI = 100; avg_gain == 0 → RSI = 0; both → 50.

use super::{Indicator, SeriesKey};
use crate::config::RsiParams;
use crate::domain::{Bar, IndicatorKind};

#[derive(Debug, Clone)]
pub struct Rsi {
    window: usize,
}

impl Rsi {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "RSI window must be >= 1");
        Self { window }
    }

    pub fn from_params(params: &RsiParams) -> Self {
        Self::new(params.window)
    }

    pub fn compute_series(&self, closes: &[f64]) -> Vec<f64> {
        let n = closes.len();
        let period = self.window;
        let mut result = vec![f64::NAN; n];

        if n < period + 1 {
            return result;
        }

        // Price changes
        let mut changes = vec![f64::NAN; n];
        for i in 1..n {
            changes[i] = closes[i] - closes[i - 1];
        }

        // Seed: average gain and average loss over first `period` changes
        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;
        for &ch in &changes[1..=period] {
            if ch.is_nan() {
                return result;
            }
            if ch > 0.0 {
                avg_gain += ch;
            } else {
                avg_loss -= ch;
            }
        }
        avg_gain /= period as f64;
        avg_loss /= period as f64;

        result[period] = compute_rsi(avg_gain, avg_loss);

        // Wilder smoothing for subsequent values
        let alpha = 1.0 / period as f64;
        for i in (period + 1)..n {
            if changes[i].is_nan() {
                for val in result.iter_mut().skip(i) {
                    *val = f64::NAN;
                }
                return result;
            }

            let gain = changes[i].max(0.0);
            let loss = (-changes[i]).max(0.0);

            avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
            avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;

            result[i] = compute_rsi(avg_gain, avg_loss);
        }

        result
    }
}

impl Indicator for Rsi {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Rsi
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn compute(&self, bars: &[Bar]) -> Vec<(SeriesKey, Vec<f64>)> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        vec![(SeriesKey::Rsi, self.compute_series(&closes))]
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
