//! Presentation labels for clusters.
//!
//! Volatility is labelled by rank among the clusters of one run. Trend and
//! volume are labelled against fixed cut-offs. Nothing downstream branches
//! on these labels.

use crate::domain::{
    FeatureVector, StateCharacteristics, TrendDirection, VolatilityLevel, VolumeLevel,
};

const TREND_CUTOFF: f64 = 0.1;
const VOLUME_BAND: f64 = 0.1;

/// Characteristics for every centroid, given the mean volatility of the window.
pub fn characterize(centroids: &[FeatureVector], window_volatility: f64) -> Vec<StateCharacteristics> {
    let ranks = volatility_ranks(centroids);
    centroids
        .iter()
        .zip(ranks)
        .map(|(c, rank)| {
            let volatility_level = volatility_level(rank, centroids.len(), c.volatility);
            let trend_direction = trend_direction(c.trend_strength);
            let volume_level = volume_level(c.volume_ratio);
            let relative_volatility = if window_volatility > 0.0 {
                c.volatility / window_volatility
            } else {
                1.0
            };
            StateCharacteristics {
                volatility: c.volatility,
                trend_strength: c.trend_strength,
                volume_ratio: c.volume_ratio,
                return_dispersion: c.return_dispersion,
                relative_volatility,
                volatility_level,
                trend_direction,
                volume_level,
                description: describe(volatility_level, trend_direction),
            }
        })
        .collect()
}

/// Rank of each centroid by ascending volatility; ties broken by position.
fn volatility_ranks(centroids: &[FeatureVector]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..centroids.len()).collect();
    order.sort_by(|&a, &b| {
        centroids[a]
            .volatility
            .total_cmp(&centroids[b].volatility)
            .then(a.cmp(&b))
    });
    let mut ranks = vec![0; centroids.len()];
    for (rank, &idx) in order.iter().enumerate() {
        ranks[idx] = rank;
    }
    ranks
}

fn volatility_level(rank: usize, count: usize, volatility: f64) -> VolatilityLevel {
    if count <= 1 {
        return if volatility <= f64::EPSILON {
            VolatilityLevel::Low
        } else {
            VolatilityLevel::Moderate
        };
    }
    let position = rank as f64 / (count - 1) as f64;
    if position < 1.0 / 3.0 {
        VolatilityLevel::Low
    } else if position > 2.0 / 3.0 {
        VolatilityLevel::High
    } else {
        VolatilityLevel::Moderate
    }
}

fn trend_direction(trend: f64) -> TrendDirection {
    if trend > TREND_CUTOFF {
        TrendDirection::Up
    } else if trend < -TREND_CUTOFF {
        TrendDirection::Down
    } else {
        TrendDirection::Sideways
    }
}

fn volume_level(ratio: f64) -> VolumeLevel {
    if ratio > 1.0 + VOLUME_BAND {
        VolumeLevel::Above
    } else if ratio < 1.0 - VOLUME_BAND {
        VolumeLevel::Below
    } else {
        VolumeLevel::Average
    }
}

fn describe(vol: VolatilityLevel, trend: TrendDirection) -> String {
    let adjective = match vol {
        VolatilityLevel::Low => "calm",
        VolatilityLevel::Moderate => "steady",
        VolatilityLevel::High => "volatile",
    };
    let noun = match trend {
        TrendDirection::Up => "uptrend",
        TrendDirection::Down => "downtrend",
        TrendDirection::Sideways => "range-bound",
    };
    format!("{adjective} {noun}")
}
