//! Bar — the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single period.
///
/// A series of bars is ordered by strictly increasing `timestamp`.
/// Volume is a float so fractional (crypto) volumes survive loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Input contract violations for a bar series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar {index}: non-finite value in OHLCV")]
    NonFinite { index: usize },
    #[error("bar {index}: high {high} is below low {low}")]
    HighBelowLow { index: usize, high: f64, low: f64 },
    #[error("bar {index}: non-positive price")]
    NonPositivePrice { index: usize },
    #[error("bar {index}: negative volume {volume}")]
    NegativeVolume { index: usize, volume: f64 },
    #[error("bar {index}: timestamp {timestamp} does not follow {previous}")]
    NonIncreasingTimestamp {
        index: usize,
        previous: NaiveDateTime,
        timestamp: NaiveDateTime,
    },
}

impl Bar {
    /// Returns true if any OHLCV field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, low <= open/close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
            && self.volume >= 0.0
    }
}

/// Check a bar series against the input contract.
///
/// Rejects non-finite fields, inverted ranges, non-positive prices,
/// negative volume, and timestamps that are duplicated or out of order. Open/close outside the
/// high/low range is tolerated; some vendors report it after adjustments.
pub fn validate_series(bars: &[Bar]) -> Result<(), BarError> {
    for (index, bar) in bars.iter().enumerate() {
        if bar.is_void() {
            return Err(BarError::NonFinite { index });
        }
        if bar.high < bar.low {
            return Err(BarError::HighBelowLow {
                index,
                high: bar.high,
                low: bar.low,
            });
        }
        if bar.low <= 0.0 || bar.open <= 0.0 || bar.close <= 0.0 {
            return Err(BarError::NonPositivePrice { index });
        }
        if bar.volume < 0.0 {
            return Err(BarError::NegativeVolume {
                index,
                volume: bar.volume,
            });
        }
        if index > 0 {
            let previous = bars[index - 1].timestamp;
            if bar.timestamp <= previous {
                return Err(BarError::NonIncreasingTimestamp {
                    index,
                    previous,
                    timestamp: bar.timestamp,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_bar() -> Bar {
        Bar {
            timestamp: at(2),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0; // below low
        assert!(!bar.is_sane());
    }

    #[test]
    fn validate_accepts_ordered_series() {
        let mut second = sample_bar();
        second.timestamp = at(3);
        assert!(validate_series(&[sample_bar(), second]).is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_timestamp() {
        let err = validate_series(&[sample_bar(), sample_bar()]).unwrap_err();
        assert!(matches!(
            err,
            BarError::NonIncreasingTimestamp { index: 1, .. }
        ));
    }

    #[test]
    fn validate_rejects_nan_volume() {
        let mut bar = sample_bar();
        bar.volume = f64::NAN;
        assert_eq!(
            validate_series(&[bar]).unwrap_err(),
            BarError::NonFinite { index: 0 }
        );
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let mut bar = sample_bar();
        bar.low = 110.0;
        assert!(matches!(
            validate_series(&[bar]).unwrap_err(),
            BarError::HighBelowLow { index: 0, .. }
        ));
    }

    #[test]
    fn validate_rejects_zero_close() {
        let mut bar = sample_bar();
        bar.close = 0.0;
        assert_eq!(
            validate_series(&[bar]).unwrap_err(),
            BarError::NonPositivePrice { index: 0 }
        );
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
