//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seed: SMA of the first `period` valid values.
//! Lookback: period - 1 past the first valid input.

/// EMA of an arbitrary series.
///
/// Leading NaNs are skipped: the seed window starts at the first valid value,
/// which lets MACD take the EMA of its own (warm-up padded) line. A NaN
/// inside the seed window or after it taints every later value.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 {
        return result;
    }
    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };
    if n - start < period {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);

    // Seed: SMA of first `period` values
    let mut sum = 0.0;
    for &v in &values[start..start + period] {
        if v.is_nan() {
            return result;
        }
        sum += v;
    }
    let seed = sum / period as f64;
    let seed_index = start + period - 1;
    result[seed_index] = seed;

    let mut prev = seed;
    for i in (seed_index + 1)..n {
        if values[i].is_nan() {
            for val in result.iter_mut().skip(i) {
                *val = f64::NAN;
            }
            return result;
        }
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn ema_period_1_equals_input() {
        let result = ema_of_series(&[100.0, 200.0, 300.0], 1);
        assert_approx(result[0], 100.0, DEFAULT_EPSILON);
        assert_approx(result[1], 200.0, DEFAULT_EPSILON);
        assert_approx(result[2], 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_3_known_values() {
        // alpha = 0.5, seed at index 2: SMA(10,11,12) = 11.0
        // EMA[3] = 0.5*13 + 0.5*11 = 12.0; EMA[4] = 0.5*14 + 0.5*12 = 13.0
        let result = ema_of_series(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_leading_nan_shifts_seed() {
        let result = ema_of_series(&[f64::NAN, f64::NAN, 10.0, 11.0, 12.0, 13.0], 3);
        assert!(result[3].is_nan());
        assert_approx(result[4], 11.0, DEFAULT_EPSILON);
        assert_approx(result[5], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_nan_in_seed_produces_all_nan() {
        let result = ema_of_series(&[10.0, f64::NAN, 12.0, 13.0, 14.0], 3);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_nan_after_seed_propagates() {
        let result = ema_of_series(&[10.0, 11.0, 12.0, f64::NAN, 14.0], 3);
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
    }
}
