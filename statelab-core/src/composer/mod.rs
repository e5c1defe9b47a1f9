//! Signal composer: state-adjusted indicator votes into one discrete signal.
//!
//! For a bar and its state:
//! - each enabled indicator votes against its scaled thresholds
//! - votes are averaged by state-scaled weight into `composite_score`
//! - state confidence and volume combine into `confidence`
//! - the pair is discretized into BUY / SELL / HOLD
//!
//! Pure: the same inputs always give the same `Signal`.

pub mod votes;

pub use votes::IndicatorReading;

use std::collections::BTreeSet;

use crate::adjust::ThresholdAdjuster;
use crate::config::{AnalysisConfig, IndicatorConfig, SignalConfig};
use crate::domain::{Bar, Signal, SignalType, State};
use crate::indicators::IndicatorSeries;

/// A signal together with the readings it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub signal: Signal,
    pub readings: Vec<IndicatorReading>,
}

#[derive(Debug, Clone)]
pub struct SignalComposer {
    indicators: Vec<IndicatorConfig>,
    adjuster: ThresholdAdjuster,
    config: SignalConfig,
}

impl SignalComposer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            indicators: config.indicators.clone(),
            adjuster: ThresholdAdjuster::new(&config.adjustment),
            config: config.signal.clone(),
        }
    }

    /// Readings for every enabled indicator, in configuration order.
    pub fn readings(
        &self,
        bars: &[Bar],
        bar_index: usize,
        series: &IndicatorSeries,
        state: &State,
    ) -> Vec<IndicatorReading> {
        let adjustment = self.adjuster.adjust(state);
        self.indicators
            .iter()
            .map(|ind| {
                votes::read(
                    ind,
                    bars,
                    bar_index,
                    series,
                    adjustment.get(ind.kind()),
                    self.config.threshold_lookback,
                )
            })
            .collect()
    }

    /// Build the signal for `bars[bar_index]` under `state`.
    ///
    /// `volume_ratio` is the bar's feature-space volume ratio. Panics if
    /// `bar_index` is out of range.
    pub fn compose(
        &self,
        bars: &[Bar],
        bar_index: usize,
        series: &IndicatorSeries,
        state: &State,
        volume_ratio: f64,
    ) -> Composition {
        let readings = self.readings(bars, bar_index, series, state);
        let composite_score = composite_score(&readings);
        let confidence = signal_confidence(
            state.confidence,
            volume_ratio,
            self.config.full_volume_ratio,
        );
        let signal_type = classify(composite_score, confidence, &self.config);
        let contributing_indicators: BTreeSet<_> = readings
            .iter()
            .filter(|r| r.is_defined() && r.vote != 0)
            .map(|r| r.indicator)
            .collect();

        Composition {
            signal: Signal {
                timestamp: bars[bar_index].timestamp,
                bar_index,
                signal_type,
                composite_score,
                confidence,
                contributing_indicators,
                state_context: state.clone(),
            },
            readings,
        }
    }
}

/// Weighted mean of defined votes, clipped to [-1, 1].
///
/// Zero when no reading is defined or all defined weights are zero.
pub fn composite_score(readings: &[IndicatorReading]) -> f64 {
    let (num, den) = readings
        .iter()
        .filter(|r| r.is_defined())
        .fold((0.0, 0.0), |(num, den), r| {
            (num + f64::from(r.vote) * r.weight, den + r.weight)
        });
    if den <= 0.0 {
        return 0.0;
    }
    (num / den).clamp(-1.0, 1.0)
}

/// Geometric mean of state confidence and a volume factor, in [0, 1].
///
/// Volume at or above `full_volume_ratio` times its rolling mean counts
/// fully; thinner volume discounts proportionally.
pub fn signal_confidence(state_confidence: f64, volume_ratio: f64, full_volume_ratio: f64) -> f64 {
    let volume_factor = if full_volume_ratio > 0.0 && volume_ratio.is_finite() {
        (volume_ratio / full_volume_ratio).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let state = if state_confidence.is_finite() {
        state_confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (state * volume_factor).sqrt().clamp(0.0, 1.0)
}

/// Scores exactly on `±min_signal_strength` are HOLD.
pub fn classify(composite_score: f64, confidence: f64, config: &SignalConfig) -> SignalType {
    let confident = confidence >= config.min_confidence;
    if confident && composite_score > config.min_signal_strength {
        SignalType::Buy
    } else if confident && composite_score < -config.min_signal_strength {
        SignalType::Sell
    } else {
        SignalType::Hold
    }
}
