//! Analysis report: everything a presentation layer needs, precomputed.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::composer::IndicatorReading;
use crate::domain::{Signal, SignalType, State};
use crate::indicators::IndicatorSeries;
use crate::state::PcaDiagnostics;

/// Bumped whenever the serialized report layout changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Output of one `analyze()` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub schema_version: u32,
    /// BLAKE3 of the configuration that produced this report.
    pub config_fingerprint: String,
    pub bar_count: usize,
    pub first_timestamp: NaiveDateTime,
    pub last_timestamp: NaiveDateTime,

    pub latest_signal: Signal,
    /// One signal per state-assigned bar, oldest first. Empty when history
    /// reconstruction is disabled.
    pub history: Vec<Signal>,

    pub current_state: State,
    pub states: Vec<State>,
    /// Feature matrix had no usable variance; `states` holds one
    /// zero-confidence state.
    pub degenerate: bool,
    pub pca: Option<PcaDiagnostics>,

    /// Latest-bar reading per enabled indicator with its active thresholds.
    pub indicator_snapshot: Vec<IndicatorReading>,
    /// State id per bar, `None` during feature warm-up.
    pub state_timeline: Vec<Option<usize>>,
    pub transition_count: usize,

    /// Full indicator series, aligned with the input bars. Not serialized;
    /// empty after a JSON round trip.
    #[serde(skip)]
    pub indicators: IndicatorSeries,
}

impl AnalysisReport {
    pub fn signal_type(&self) -> SignalType {
        self.latest_signal.signal_type
    }

    /// Count of historical signals of one type.
    pub fn count(&self, signal_type: SignalType) -> usize {
        self.history
            .iter()
            .filter(|s| s.signal_type == signal_type)
            .count()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
