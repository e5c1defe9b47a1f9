//! The `analyze()` pipeline.

use tracing::{debug, info};

use crate::composer::SignalComposer;
use crate::config::AnalysisConfig;
use crate::domain::{validate_series, Bar};
use crate::error::EngineError;
use crate::features::FeatureExtractor;
use crate::indicators::IndicatorEngine;
use crate::state::StateIdentifier;

use super::report::{AnalysisReport, SCHEMA_VERSION};

/// Run the full analysis for one bar series.
///
/// 1. Validate configuration and bars (fail fast)
/// 2. Compute indicator series
/// 3. Extract features and identify market states
/// 4. Compose the latest signal and, if configured, the full history
///
/// Stateless: the same bars and config always produce the same report.
pub fn analyze(bars: &[Bar], config: &AnalysisConfig) -> Result<AnalysisReport, EngineError> {
    // Step 1: Validate
    config.validate()?;
    validate_series(bars)?;
    let required = config.required_bars();
    if bars.len() < required {
        return Err(EngineError::InsufficientData {
            required,
            actual: bars.len(),
        });
    }

    // Step 2: Indicators
    let engine = IndicatorEngine::new(&config.indicators);
    let indicators = engine.compute(bars);
    debug!(series = indicators.len(), lookback = engine.max_lookback(), "computed indicators");

    // Step 3: Features and states
    let features = FeatureExtractor::new(&config.features).extract(bars);
    let model = StateIdentifier::new(&config.states, config.seed).identify(&features, config.num_states)?;

    // Step 4: Signals
    let last = bars.len() - 1;
    let current_state = model
        .current_state()
        .cloned()
        .ok_or(EngineError::InsufficientData {
            required,
            actual: bars.len(),
        })?;
    let volume_ratio_at = |bar_index: usize| {
        features
            .row_for_bar(bar_index)
            .map_or(1.0, |row| row.volume_ratio)
    };

    let composer = SignalComposer::new(config);
    let latest = composer.compose(bars, last, &indicators, &current_state, volume_ratio_at(last));

    let history = if config.signal.include_history {
        model
            .assignments
            .iter()
            .enumerate()
            .filter_map(|(row, &state_id)| {
                let bar_index = features.bar_index(row);
                model.state(state_id).map(|state| {
                    composer
                        .compose(bars, bar_index, &indicators, state, volume_ratio_at(bar_index))
                        .signal
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    info!(
        bars = bars.len(),
        states = model.states.len(),
        current_state = current_state.state_id,
        state = %current_state.characteristics.description,
        signal = latest.signal.signal_type.as_str(),
        score = latest.signal.composite_score,
        confidence = latest.signal.confidence,
        "analysis complete"
    );

    Ok(AnalysisReport {
        schema_version: SCHEMA_VERSION,
        config_fingerprint: config.fingerprint(),
        bar_count: bars.len(),
        first_timestamp: bars[0].timestamp,
        last_timestamp: bars[last].timestamp,
        latest_signal: latest.signal,
        history,
        current_state,
        states: model.states.clone(),
        degenerate: model.degenerate,
        pca: model.pca.clone(),
        indicator_snapshot: latest.readings,
        state_timeline: model.timeline(bars.len()),
        transition_count: model.transition_count(),
        indicators,
    })
}
