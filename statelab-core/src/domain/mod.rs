//! Domain types for StateLab

pub mod bar;
pub mod feature;
pub mod indicator;
pub mod signal;
pub mod state;

pub use bar::{validate_series, Bar, BarError};
pub use feature::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use indicator::IndicatorKind;
pub use signal::{Signal, SignalType};
pub use state::{State, StateCharacteristics, TrendDirection, VolatilityLevel, VolumeLevel};
