//! Engine error taxonomy.

use thiserror::Error;

use crate::domain::BarError;

/// Errors surfaced by the analysis pipeline.
///
/// `NumericInstability` is raised by the scaler and PCA on a degenerate
/// feature matrix. The state identifier absorbs it and degrades to a single
/// low-confidence state, so `analyze()` never returns it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("insufficient data: need at least {required} bars, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("numeric instability: {0}")]
    NumericInstability(String),

    #[error("invalid bars: {0}")]
    InvalidBars(#[from] BarError),
}

impl EngineError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        EngineError::InvalidConfiguration(msg.into())
    }
}
