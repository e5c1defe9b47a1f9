//! TOML configuration files.
//!
//! Every section is optional; missing keys fall back to the core defaults.
//! The parsed config is validated before it is handed back, so callers
//! never see an `AnalysisConfig` that `analyze()` would reject.
//!
//! ```toml
//! num_states = 3
//! seed = 42
//!
//! [[indicators]]
//! type = "rsi"
//! window = 14
//! oversold = 30.0
//! overbought = 70.0
//! weight = 0.3
//!
//! [states.components]
//! mode = "variance"
//! threshold = 0.9
//! ```

use std::path::{Path, PathBuf};

use statelab_core::{AnalysisConfig, EngineError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config TOML: {0}")]
    Render(#[from] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] EngineError),
}

/// Parse and validate a config from TOML text.
pub fn parse_config(toml_str: &str) -> Result<AnalysisConfig, ConfigError> {
    let config: AnalysisConfig = toml::from_str(toml_str)?;
    config.validate()?;
    Ok(config)
}

/// Read, parse, and validate a config file.
pub fn load_config(path: &Path) -> Result<AnalysisConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content)?;
    tracing::debug!(
        path = %path.display(),
        fingerprint = %config.fingerprint(),
        "loaded analysis config"
    );
    Ok(config)
}

/// Render a config as TOML.
pub fn render_config(config: &AnalysisConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

/// The default config as a TOML document, a starting point for edits.
pub fn default_config_toml() -> Result<String, ConfigError> {
    render_config(&AnalysisConfig::default())
}
