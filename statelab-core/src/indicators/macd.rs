//! Moving Average Convergence Divergence (MACD).
//!
//! line = EMA(close, fast) - EMA(close, slow)
//! signal = EMA(line, signal)
//! histogram = line - signal
//! Lookback: slow - 1 for the line, slow + signal - 2 for signal/histogram.

use super::ema::ema_of_series;
use super::{Indicator, SeriesKey};
use crate::config::MacdParams;
use crate::domain::{Bar, IndicatorKind};

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
}

/// The three MACD outputs, each aligned with the input bars.
#[derive(Debug, Clone)]
pub struct MacdOutput {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(fast < slow, "MACD fast period must be shorter than slow");
        Self { fast, slow, signal }
    }

    pub fn from_params(params: &MacdParams) -> Self {
        Self::new(params.fast, params.slow, params.signal)
    }

    pub fn compute_series(&self, closes: &[f64]) -> MacdOutput {
        let fast = ema_of_series(closes, self.fast);
        let slow = ema_of_series(closes, self.slow);
        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = ema_of_series(&line, self.signal);
        let histogram = line.iter().zip(&signal).map(|(l, s)| l - s).collect();
        MacdOutput {
            line,
            signal,
            histogram,
        }
    }
}

impl Indicator for Macd {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Macd
    }

    fn lookback(&self) -> usize {
        self.slow - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<(SeriesKey, Vec<f64>)> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let out = self.compute_series(&closes);
        vec![
            (SeriesKey::Macd, out.line),
            (SeriesKey::MacdSignal, out.signal),
            (SeriesKey::MacdHist, out.histogram),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn macd_warmup_alignment() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let out = Macd::new(3, 6, 4).compute_series(&closes);
        assert!(out.line[4].is_nan());
        assert!(!out.line[5].is_nan());
        // signal seeds on the first 4 line values: index 5 + 4 - 1 = 8
        assert!(out.signal[7].is_nan());
        assert!(!out.signal[8].is_nan());
        assert!(out.histogram[7].is_nan());
        assert!(!out.histogram[8].is_nan());
    }

    #[test]
    fn macd_linear_trend_converges_to_lag_gap() {
        // For a unit-slope line, EMA(p) lags by (p-1)/2, so the line
        // converges to (slow - fast) / 2 and the histogram to 0.
        let closes: Vec<f64> = (0..300).map(|i| 100.0 + i as f64).collect();
        let out = Macd::new(12, 26, 9).compute_series(&closes);
        assert_approx(out.line[299], 7.0, 1e-6);
        assert_approx(out.histogram[299], 0.0, 1e-6);
    }

    #[test]
    fn macd_constant_price_is_zero() {
        let out = Macd::new(3, 6, 4).compute_series(&[50.0; 20]);
        assert_approx(out.line[19], 0.0, DEFAULT_EPSILON);
        assert_approx(out.signal[19], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let out = Macd::new(12, 26, 9).compute_series(&closes);
        for i in 34..60 {
            assert_approx(out.histogram[i], out.line[i] - out.signal[i], DEFAULT_EPSILON);
        }
    }
}
