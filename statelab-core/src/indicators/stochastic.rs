//! Stochastic Oscillator.
//!
//! %K = (close - lowest low) / (highest high - lowest low) * 100 over `k_period` bars.
//! %D = SMA(%K, d_period).
//! A flat window (highest high == lowest low) reads 50.
//! Lookback: k_period - 1 for %K, k_period + d_period - 2 for %D.

use super::sma::sma_of_series;
use super::{Indicator, SeriesKey};
use crate::config::StochasticParams;
use crate::domain::{Bar, IndicatorKind};

#[derive(Debug, Clone)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize) -> Self {
        assert!(k_period >= 1 && d_period >= 1, "Stochastic periods must be >= 1");
        Self { k_period, d_period }
    }

    pub fn from_params(params: &StochasticParams) -> Self {
        Self::new(params.k_period, params.d_period)
    }

    pub fn percent_k(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut k_values = vec![f64::NAN; n];
        if n < self.k_period {
            return k_values;
        }

        for i in (self.k_period - 1)..n {
            let window = &bars[i + 1 - self.k_period..=i];
            let lowest_low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let highest_high = window
                .iter()
                .map(|b| b.high)
                .fold(f64::NEG_INFINITY, f64::max);
            let range = highest_high - lowest_low;

            k_values[i] = if range > 0.0 {
                ((bars[i].close - lowest_low) / range * 100.0).clamp(0.0, 100.0)
            } else {
                50.0
            };
        }

        k_values
    }
}

impl Indicator for Stochastic {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Stochastic
    }

    fn lookback(&self) -> usize {
        self.k_period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<(SeriesKey, Vec<f64>)> {
        let k = self.percent_k(bars);
        let d = sma_of_series(&k, self.d_period);
        vec![(SeriesKey::StochK, k), (SeriesKey::StochD, d)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn stochastic_known_value() {
        // make_bars: high = max(open, close) + 1, low = min(open, close) - 1
        // Closes 10, 11, 12: window high = 13, low = 9 → %K = (12 - 9) / 4 * 100 = 75
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let k = Stochastic::new(3, 1).percent_k(&bars);
        assert!(k[1].is_nan());
        assert_approx(k[2], 75.0, DEFAULT_EPSILON);
    }

    #[test]
    fn stochastic_flat_window_reads_fifty() {
        let mut bars = make_bars(&[10.0; 4]);
        for bar in &mut bars {
            bar.high = 10.0;
            bar.low = 10.0;
        }
        let k = Stochastic::new(3, 2).percent_k(&bars);
        assert_approx(k[3], 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn percent_d_smooths_k() {
        let bars = make_bars(&[10.0, 12.0, 11.0, 13.0, 12.0, 14.0]);
        let out = Stochastic::new(3, 2).compute(&bars);
        let (k, d) = (&out[0].1, &out[1].1);
        assert!(d[2].is_nan());
        assert_approx(d[3], (k[2] + k[3]) / 2.0, DEFAULT_EPSILON);
        assert_approx(d[5], (k[4] + k[5]) / 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn stochastic_bounds() {
        let bars = make_bars(&[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0]);
        let k = Stochastic::new(3, 3).percent_k(&bars);
        assert!(k.iter().filter(|v| !v.is_nan()).all(|v| (0.0..=100.0).contains(v)));
    }
}
