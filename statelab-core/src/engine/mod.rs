//! Analysis engine: bars and configuration in, report out.
//!
//! One call runs every stage in order:
//!
//! 1. Indicators (RSI, MACD, Stochastic, Bollinger)
//! 2. Feature extraction
//! 3. State identification (standardize, PCA, K-means)
//! 4. Threshold adjustment and signal composition

pub mod pipeline;
pub mod report;

pub use pipeline::analyze;
pub use report::{AnalysisReport, SCHEMA_VERSION};
