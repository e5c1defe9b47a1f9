//! Deterministic synthetic bar series.
//!
//! Developer fixtures and offline demos. Every generator draws from a
//! `StdRng` derived from the caller's seed and the series kind, so the same
//! `(kind, len, seed)` always yields the same bars.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use statelab_core::domain::Bar;
use statelab_core::rng::SeedHierarchy;

/// Shape of a generated series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticKind {
    /// Steady drift upward with small noise and rising volume.
    Trending,
    /// Mirror of `Trending`.
    Falling,
    /// Oscillation around a flat mean.
    RangeBound,
    /// Calm first half, turbulent second half.
    TwoRegime,
    /// Uniform daily returns in ±3%.
    RandomWalk,
}

impl SyntheticKind {
    pub const ALL: [SyntheticKind; 5] = [
        SyntheticKind::Trending,
        SyntheticKind::Falling,
        SyntheticKind::RangeBound,
        SyntheticKind::TwoRegime,
        SyntheticKind::RandomWalk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyntheticKind::Trending => "trending",
            SyntheticKind::Falling => "falling",
            SyntheticKind::RangeBound => "range_bound",
            SyntheticKind::TwoRegime => "two_regime",
            SyntheticKind::RandomWalk => "random_walk",
        }
    }

    fn stream_index(&self) -> u64 {
        match self {
            SyntheticKind::Trending => 0,
            SyntheticKind::Falling => 1,
            SyntheticKind::RangeBound => 2,
            SyntheticKind::TwoRegime => 3,
            SyntheticKind::RandomWalk => 4,
        }
    }
}

impl fmt::Display for SyntheticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyntheticKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        SyntheticKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| {
                let names: Vec<_> = SyntheticKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown series kind '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// First bar's timestamp; one bar per calendar day after that.
fn start_timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Generate `len` bars of the given shape.
pub fn generate(kind: SyntheticKind, len: usize, seed: u64) -> Vec<Bar> {
    let mut rng = SeedHierarchy::new(seed).rng_for("synthetic", kind.stream_index());
    let closes = match kind {
        SyntheticKind::Trending => drift(len, 0.5, &mut rng),
        SyntheticKind::Falling => drift(len, -0.5, &mut rng),
        SyntheticKind::RangeBound => oscillation(len, &mut rng),
        SyntheticKind::TwoRegime => two_regime(len, &mut rng),
        SyntheticKind::RandomWalk => random_walk(len, &mut rng),
    };
    let rising_volume = matches!(kind, SyntheticKind::Trending | SyntheticKind::Falling);
    to_bars(&closes, rising_volume, &mut rng)
}

fn drift(len: usize, step: f64, rng: &mut StdRng) -> Vec<f64> {
    // Keep a falling series comfortably positive.
    let base = if step < 0.0 {
        100.0 + (-step) * len as f64
    } else {
        100.0
    };
    (0..len)
        .map(|i| base + step * i as f64 + rng.gen_range(-0.3..0.3))
        .collect()
}

fn oscillation(len: usize, rng: &mut StdRng) -> Vec<f64> {
    let tau = std::f64::consts::TAU;
    (0..len)
        .map(|i| {
            let t = i as f64;
            100.0
                + 2.0 * (tau * t / 20.0).sin()
                + 0.3 * (tau * t / 7.3).sin()
                + rng.gen_range(-0.1..0.1)
        })
        .collect()
}

fn two_regime(len: usize, rng: &mut StdRng) -> Vec<f64> {
    let split = len / 2;
    let mut price = 100.0_f64;
    (0..len)
        .map(|i| {
            let amplitude = if i < split { 0.002 } else { 0.03 };
            price *= 1.0 + rng.gen_range(-amplitude..amplitude);
            price
        })
        .collect()
}

fn random_walk(len: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut price = 100.0_f64;
    (0..len)
        .map(|_| {
            price *= 1.0 + rng.gen_range(-0.03..0.03);
            price
        })
        .collect()
}

fn to_bars(closes: &[f64], rising_volume: bool, rng: &mut StdRng) -> Vec<Bar> {
    let start = start_timestamp();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
            let base_volume = if rising_volume {
                1_000_000.0 + 5_000.0 * i as f64
            } else {
                1_000_000.0
            };
            Bar {
                timestamp: start + Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: base_volume * rng.gen_range(0.9..1.1),
            }
        })
        .collect()
}
