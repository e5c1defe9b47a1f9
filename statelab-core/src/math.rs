//! Small numeric helpers shared by indicators, features, and clustering.

/// Arithmetic mean. NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance with `ddof` delta degrees of freedom (0 = population, 1 = sample).
///
/// NaN when fewer than `ddof + 1` values are supplied.
pub fn variance(values: &[f64], ddof: usize) -> f64 {
    let n = values.len();
    if n <= ddof {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n - ddof) as f64).max(0.0)
}

pub fn std_dev(values: &[f64], ddof: usize) -> f64 {
    variance(values, ddof).sqrt()
}

/// Percentile with linear interpolation between closest ranks.
///
/// `q` is in [0, 100]. Input need not be sorted. NaN for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Interquartile range (75th minus 25th percentile).
pub fn interquartile_range(values: &[f64]) -> f64 {
    percentile(values, 75.0) - percentile(values, 25.0)
}

/// Simple returns `close[t] / close[t-1] - 1`; index 0 is NaN.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; closes.len()];
    for i in 1..closes.len() {
        let prev = closes[i - 1];
        if prev != 0.0 {
            out[i] = closes[i] / prev - 1.0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn mean_and_variance() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_approx(mean(&v), 5.0, DEFAULT_EPSILON);
        assert_approx(variance(&v, 0), 4.0, DEFAULT_EPSILON);
        assert_approx(std_dev(&v, 0), 2.0, DEFAULT_EPSILON);
        assert_approx(variance(&v, 1), 32.0 / 7.0, DEFAULT_EPSILON);
    }

    #[test]
    fn variance_needs_enough_points() {
        assert!(variance(&[1.0], 1).is_nan());
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn percentile_interpolates() {
        let v = [4.0, 1.0, 3.0, 2.0];
        // sorted 1,2,3,4; rank for q=25 is 0.75 → 1.75
        assert_approx(percentile(&v, 25.0), 1.75, DEFAULT_EPSILON);
        assert_approx(percentile(&v, 75.0), 3.25, DEFAULT_EPSILON);
        assert_approx(percentile(&v, 0.0), 1.0, DEFAULT_EPSILON);
        assert_approx(percentile(&v, 100.0), 4.0, DEFAULT_EPSILON);
        assert_approx(interquartile_range(&v), 1.5, DEFAULT_EPSILON);
    }

    #[test]
    fn returns_first_is_nan() {
        let r = simple_returns(&[100.0, 110.0, 99.0]);
        assert!(r[0].is_nan());
        assert_approx(r[1], 0.1, DEFAULT_EPSILON);
        assert_approx(r[2], -0.1, DEFAULT_EPSILON);
    }
}
