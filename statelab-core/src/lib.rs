//! StateLab Core — state-aware technical signal engine.
//!
//! This crate contains the whole analysis path:
//! - Domain types (bars, feature vectors, states, signals)
//! - Indicator engine (RSI, MACD, Stochastic, Bollinger Bands)
//! - Feature extraction for market-state inference
//! - State identification (standardization, PCA, seeded K-means)
//! - State-conditioned threshold and weight adjustment
//! - Composite signal synthesis with confidence scoring

pub mod adjust;
pub mod composer;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod features;
pub mod indicators;
pub mod math;
pub mod rng;
pub mod state;

pub use config::AnalysisConfig;
pub use domain::{Bar, Signal, SignalType, State};
pub use engine::{analyze, AnalysisReport, SCHEMA_VERSION};
pub use error::EngineError;
