//! End-to-end market scenarios.
//!
//! A. steady rise on rising volume       -> positive composite, BUY
//! B. steady fall on rising volume       -> negative composite, SELL
//! C. tight oscillation, no trend        -> oscillators carry the weight,
//!                                          signals alternate with HOLD
//! D. calm regime then volatile regime   -> two states, ordered by volatility

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statelab_core::composer::IndicatorReading;
use statelab_core::domain::{Bar, IndicatorKind, SignalType};
use statelab_core::{analyze, AnalysisConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn bars_from(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 0.3,
                low: open.min(close) - 0.3,
                close,
                volume,
            }
        })
        .collect()
}

fn rising_volume(n: usize) -> Vec<f64> {
    (0..n).map(|i| 1000.0 + 10.0 * i as f64).collect()
}

fn weight_of(snapshot: &[IndicatorReading], kind: IndicatorKind) -> f64 {
    snapshot
        .iter()
        .find(|r| r.indicator == kind)
        .map(|r| r.weight)
        .unwrap()
}

// ── A. Rising market ─────────────────────────────────────────────────

#[test]
fn scenario_a_rising_market_is_buy() {
    let n = 200;
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + 0.5 * i as f64 + 0.2 * (1.3 * i as f64).sin())
        .collect();
    let report = analyze(&bars_from(&closes, &rising_volume(n)), &AnalysisConfig::default()).unwrap();

    assert!(report.current_state.characteristics.trend_strength > 0.5);
    assert!(
        report.latest_signal.composite_score > 0.0,
        "score {}",
        report.latest_signal.composite_score
    );
    assert_eq!(report.latest_signal.signal_type, SignalType::Buy);
    assert!(report
        .latest_signal
        .contributing_indicators
        .contains(&IndicatorKind::Macd));
}

// ── B. Falling market ────────────────────────────────────────────────

#[test]
fn scenario_b_falling_market_is_sell() {
    let n = 200;
    let closes: Vec<f64> = (0..n)
        .map(|i| 250.0 - 0.5 * i as f64 + 0.2 * (1.3 * i as f64).sin())
        .collect();
    let report = analyze(&bars_from(&closes, &rising_volume(n)), &AnalysisConfig::default()).unwrap();

    assert!(report.current_state.characteristics.trend_strength < -0.5);
    assert!(
        report.latest_signal.composite_score < 0.0,
        "score {}",
        report.latest_signal.composite_score
    );
    assert_eq!(report.latest_signal.signal_type, SignalType::Sell);
}

// ── C. Range-bound market ────────────────────────────────────────────

#[test]
fn scenario_c_range_bound_favors_oscillators() {
    let n = 200;
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            100.0
                + 2.0 * (std::f64::consts::TAU * t / 20.0).sin()
                + 0.3 * (std::f64::consts::TAU * t / 7.3).sin()
        })
        .collect();
    let report = analyze(&bars_from(&closes, &vec![1000.0; n]), &AnalysisConfig::default()).unwrap();

    assert!(report.current_state.characteristics.trend_strength.abs() < 0.2);

    let snapshot = &report.indicator_snapshot;
    let oscillators =
        weight_of(snapshot, IndicatorKind::Rsi) + weight_of(snapshot, IndicatorKind::Stochastic);
    let followers =
        weight_of(snapshot, IndicatorKind::Macd) + weight_of(snapshot, IndicatorKind::Bollinger);
    assert!(oscillators > followers, "{oscillators} vs {followers}");

    assert!(report.count(SignalType::Hold) > 0);
    assert!(report.count(SignalType::Buy) + report.count(SignalType::Sell) > 0);
    // HOLD dominates: directional calls only at band edges.
    assert!(report.count(SignalType::Hold) > report.history.len() / 3);
}

// ── D. Two volatility regimes ────────────────────────────────────────

#[test]
fn scenario_d_two_regimes_recovered() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut closes = Vec::with_capacity(300);
    let mut price = 100.0;
    for i in 0..300 {
        let amplitude = if i < 150 { 0.002 } else { 0.03 };
        price *= 1.0 + amplitude * (rng.gen::<f64>() * 2.0 - 1.0);
        closes.push(price);
    }
    let config = AnalysisConfig {
        num_states: 2,
        ..Default::default()
    };
    let report = analyze(&bars_from(&closes, &vec![1000.0; 300]), &config).unwrap();

    assert!(!report.degenerate);
    assert_eq!(report.states.len(), 2);

    let calm = report.state_timeline[100].unwrap();
    let wild = report.state_timeline[280].unwrap();
    assert_ne!(calm, wild);
    assert!(
        report.states[wild].characteristics.volatility
            > report.states[calm].characteristics.volatility
    );

    let mut ids: Vec<usize> = report.state_timeline.iter().flatten().copied().collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 2);
}
