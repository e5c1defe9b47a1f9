//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Bounded output: composite score in [-1, 1], confidence in [0, 1]
//! 2. Alignment: every indicator series has one entry per bar
//! 3. Label count: distinct state ids never exceed `num_states`

use chrono::NaiveDate;
use proptest::prelude::*;
use statelab_core::domain::Bar;
use statelab_core::{analyze, AnalysisConfig};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Random walk from per-bar percentage moves and volumes.
fn arb_bars() -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((-0.05..0.05_f64, 100.0..10_000.0_f64), 30..160).prop_map(|steps| {
        let base = NaiveDate::from_ymd_opt(2021, 1, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut price = 50.0;
        steps
            .into_iter()
            .enumerate()
            .map(|(i, (ret, volume))| {
                let open = price;
                price *= 1.0 + ret;
                Bar {
                    timestamp: base + chrono::Duration::days(i as i64),
                    open,
                    high: open.max(price) * 1.01,
                    low: open.min(price) * 0.99,
                    close: price,
                    volume,
                }
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn outputs_are_bounded(bars in arb_bars(), num_states in 2usize..=5) {
        let config = AnalysisConfig { num_states, ..Default::default() };
        let report = analyze(&bars, &config).unwrap();
        for signal in report.history.iter().chain(std::iter::once(&report.latest_signal)) {
            prop_assert!((-1.0..=1.0).contains(&signal.composite_score));
            prop_assert!((0.0..=1.0).contains(&signal.confidence));
        }
        for state in &report.states {
            prop_assert!((0.0..=1.0).contains(&state.confidence));
        }
    }

    #[test]
    fn series_align_with_bars(bars in arb_bars()) {
        let report = analyze(&bars, &AnalysisConfig::default()).unwrap();
        for key in report.indicators.keys() {
            let series = report.indicators.get_series(key).unwrap();
            prop_assert_eq!(series.len(), bars.len());
        }
        prop_assert_eq!(report.state_timeline.len(), bars.len());
    }

    #[test]
    fn state_ids_bounded_by_request(bars in arb_bars(), num_states in 2usize..=5) {
        let config = AnalysisConfig { num_states, ..Default::default() };
        let report = analyze(&bars, &config).unwrap();
        prop_assert!(report.states.len() <= num_states);
        for id in report.state_timeline.iter().flatten() {
            prop_assert!(*id < num_states);
        }
    }
}
