//! StateLab Runner: everything between files on disk and `analyze()`.
//!
//! This crate builds on `statelab-core` to provide:
//! - CSV bar loading with contract validation and dataset hashing
//! - TOML configuration files
//! - Deterministic synthetic series for fixtures and demos
//! - Parallel batch analysis across symbols with per-symbol failure isolation
//! - JSON / CSV / Markdown export of analysis reports

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod synthetic;

pub use batch::{
    analyze_file, analyze_symbol, BarSource, BatchJob, BatchResult, BatchRunner, RunError,
    SummaryRow, SymbolOutcome,
};
pub use config::{default_config_toml, load_config, parse_config, render_config, ConfigError};
pub use data_loader::{
    dataset_hash, discover_csv_files, load_bars_csv, read_bars, symbol_from_path, LoadError,
};
pub use export::{
    export_json, export_signals_csv, export_states_csv, export_summary_csv, generate_report,
    import_json, save_artifacts,
};
pub use synthetic::{generate, SyntheticKind};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn batch_types_are_send_sync() {
        assert_send::<BatchJob>();
        assert_sync::<BatchJob>();
        assert_send::<BatchRunner>();
        assert_sync::<BatchRunner>();
        assert_send::<SymbolOutcome>();
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
