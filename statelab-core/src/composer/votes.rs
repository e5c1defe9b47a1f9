//! Per-indicator votes against state-adjusted thresholds.
//!
//! RSI and Stochastic are read contrarian: below the lower band votes buy,
//! above the upper band votes sell. MACD and Bollinger follow the move: a
//! MACD line above its upper threshold or a close above the upper band votes
//! buy. Readings on a band edge are neutral.

use serde::{Deserialize, Serialize};

use crate::adjust::{scale_band, ScaleFactors};
use crate::config::IndicatorConfig;
use crate::domain::{Bar, IndicatorKind};
use crate::indicators::{IndicatorSeries, SeriesKey};
use crate::math::std_dev;

/// One indicator's view of one bar, with the thresholds that were active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReading {
    pub indicator: IndicatorKind,
    /// Primary value: RSI, MACD line, %K, or the close for Bollinger.
    pub value: Option<f64>,
    pub lower_threshold: Option<f64>,
    pub upper_threshold: Option<f64>,
    pub threshold_scale: f64,
    pub base_weight: f64,
    /// `base_weight * weight_scale` for the bar's state.
    pub weight: f64,
    /// -1 sell, 0 neutral, +1 buy. Always 0 when undefined.
    pub vote: i8,
}

impl IndicatorReading {
    /// Whether the reading carries evidence. Undefined readings are left out
    /// of the composite entirely rather than counted as neutral.
    pub fn is_defined(&self) -> bool {
        self.value.is_some() && self.lower_threshold.is_some() && self.upper_threshold.is_some()
    }
}

/// Evaluate one configured indicator at `bar_index`.
pub fn read(
    config: &IndicatorConfig,
    bars: &[Bar],
    bar_index: usize,
    series: &IndicatorSeries,
    factors: ScaleFactors,
    threshold_lookback: usize,
) -> IndicatorReading {
    let scale = factors.threshold_scale;
    let (value, bands) = match config {
        IndicatorConfig::Rsi(p) => (
            series.get(SeriesKey::Rsi, bar_index),
            Some(scale_band(p.oversold, p.overbought, scale)),
        ),
        IndicatorConfig::Stochastic(p) => (
            series.get(SeriesKey::StochK, bar_index),
            Some(scale_band(p.oversold, p.overbought, scale)),
        ),
        IndicatorConfig::Macd(p) => {
            let line = series.get(SeriesKey::Macd, bar_index);
            let threshold = series
                .get_series(SeriesKey::Macd)
                .and_then(|s| trailing_std(s, bar_index, threshold_lookback))
                .map(|sd| p.threshold_std * scale * sd);
            (line, threshold.map(|t| (-t, t)))
        }
        IndicatorConfig::Bollinger(_) => {
            let close = bars.get(bar_index).map(|b| b.close);
            let mid = series.get(SeriesKey::BbMid, bar_index);
            let upper = series.get(SeriesKey::BbUpper, bar_index);
            let lower = series.get(SeriesKey::BbLower, bar_index);
            let bands = match (mid, upper, lower) {
                (Some(m), Some(u), Some(l)) => Some((m - (m - l) * scale, m + (u - m) * scale)),
                _ => None,
            };
            (close, bands)
        }
    };

    let kind = config.kind();
    let vote = match (value, bands) {
        (Some(v), Some((lo, hi))) => band_vote(v, lo, hi, kind.is_oscillator()),
        _ => 0,
    };
    let base_weight = config.weight();

    IndicatorReading {
        indicator: kind,
        value,
        lower_threshold: bands.map(|b| b.0),
        upper_threshold: bands.map(|b| b.1),
        threshold_scale: scale,
        base_weight,
        weight: base_weight * factors.weight_scale,
        vote,
    }
}

fn band_vote(value: f64, lower: f64, upper: f64, contrarian: bool) -> i8 {
    let direction = if value > upper {
        1
    } else if value < lower {
        -1
    } else {
        0
    };
    if contrarian {
        -direction
    } else {
        direction
    }
}

/// Sample std of the defined values in the trailing `lookback` bars ending at
/// `end`. `None` with fewer than two defined values.
fn trailing_std(values: &[f64], end: usize, lookback: usize) -> Option<f64> {
    if end >= values.len() {
        return None;
    }
    let start = (end + 1).saturating_sub(lookback);
    let window: Vec<f64> = values[start..=end]
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();
    if window.len() < 2 {
        return None;
    }
    Some(std_dev(&window, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BollingerParams, MacdParams, RsiParams};
    use crate::indicators::make_bars;

    fn series_with(key: SeriesKey, values: Vec<f64>) -> IndicatorSeries {
        let mut s = IndicatorSeries::new(values.len());
        s.insert(key, values);
        s
    }

    #[test]
    fn oscillator_votes_contrarian() {
        assert_eq!(band_vote(25.0, 30.0, 70.0, true), 1);
        assert_eq!(band_vote(75.0, 30.0, 70.0, true), -1);
        assert_eq!(band_vote(50.0, 30.0, 70.0, true), 0);
    }

    #[test]
    fn band_edges_are_neutral() {
        assert_eq!(band_vote(30.0, 30.0, 70.0, true), 0);
        assert_eq!(band_vote(70.0, 30.0, 70.0, false), 0);
    }

    #[test]
    fn rsi_reading_uses_scaled_band() {
        let bars = make_bars(&[100.0; 3]);
        let series = series_with(SeriesKey::Rsi, vec![f64::NAN, 35.0, 35.0]);
        let config = IndicatorConfig::Rsi(RsiParams::default());
        let tight = ScaleFactors { threshold_scale: 0.5, weight_scale: 2.0 };
        let r = read(&config, &bars, 2, &series, tight, 50);
        // Band shrinks to 40/60, so 35 is now oversold.
        assert_eq!(r.lower_threshold, Some(40.0));
        assert_eq!(r.vote, 1);
        assert!((r.weight - 0.6).abs() < 1e-12);

        let r = read(&config, &bars, 2, &series, ScaleFactors::IDENTITY, 50);
        assert_eq!(r.vote, 0);
    }

    #[test]
    fn warmup_reading_is_undefined() {
        let bars = make_bars(&[100.0; 3]);
        let series = series_with(SeriesKey::Rsi, vec![f64::NAN, 35.0, 35.0]);
        let r = read(
            &IndicatorConfig::Rsi(RsiParams::default()),
            &bars,
            0,
            &series,
            ScaleFactors::IDENTITY,
            50,
        );
        assert!(!r.is_defined());
        assert_eq!(r.vote, 0);
    }

    #[test]
    fn macd_threshold_tracks_line_dispersion() {
        let bars = make_bars(&[100.0; 6]);
        let line = vec![f64::NAN, 0.0, 1.0, 0.0, 1.0, 5.0];
        let series = series_with(SeriesKey::Macd, line);
        let config = IndicatorConfig::Macd(MacdParams {
            threshold_std: 1.0,
            ..Default::default()
        });
        let r = read(&config, &bars, 5, &series, ScaleFactors::IDENTITY, 50);
        let sd = std_dev(&[0.0, 1.0, 0.0, 1.0, 5.0], 1);
        assert!((r.upper_threshold.unwrap() - sd).abs() < 1e-12);
        assert_eq!(r.vote, 1);

        // Single defined value: no dispersion, no threshold.
        let r = read(&config, &bars, 1, &series, ScaleFactors::IDENTITY, 50);
        assert!(!r.is_defined());
    }

    #[test]
    fn bollinger_follows_breakouts() {
        let bars = make_bars(&[100.0, 100.0, 107.0]);
        let mut series = IndicatorSeries::new(3);
        series.insert(SeriesKey::BbMid, vec![f64::NAN, 100.0, 100.0]);
        series.insert(SeriesKey::BbUpper, vec![f64::NAN, 104.0, 104.0]);
        series.insert(SeriesKey::BbLower, vec![f64::NAN, 96.0, 96.0]);
        let config = IndicatorConfig::Bollinger(BollingerParams::default());

        let r = read(&config, &bars, 2, &series, ScaleFactors::IDENTITY, 50);
        assert_eq!(r.vote, 1);

        // Doubling the band width swallows the breakout.
        let wide = ScaleFactors { threshold_scale: 2.0, weight_scale: 1.0 };
        let r = read(&config, &bars, 2, &series, wide, 50);
        assert_eq!(r.upper_threshold, Some(108.0));
        assert_eq!(r.vote, 0);
    }
}
