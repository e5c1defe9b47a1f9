//! Batch analysis over many symbols.
//!
//! Each job owns its bars and a private copy of the configuration, so
//! symbols fan out across the rayon pool with no shared mutable state.
//! A failing symbol is recorded in its outcome and never aborts the batch.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use statelab_core::domain::Bar;
use statelab_core::{analyze, AnalysisConfig, AnalysisReport, EngineError, SignalType};
use thiserror::Error;

use crate::config::ConfigError;
use crate::data_loader::{load_bars_csv, symbol_from_path, LoadError};

/// Any failure along the load → analyze path.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("load: {0}")]
    Load(#[from] LoadError),

    #[error("analysis: {0}")]
    Engine(#[from] EngineError),
}

/// Where a job's bars come from.
#[derive(Debug, Clone)]
pub enum BarSource {
    Csv(PathBuf),
    Bars(Vec<Bar>),
}

/// One symbol to analyze.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub symbol: String,
    pub source: BarSource,
}

impl BatchJob {
    pub fn from_csv(path: &Path) -> Self {
        Self {
            symbol: symbol_from_path(path),
            source: BarSource::Csv(path.to_path_buf()),
        }
    }

    pub fn from_bars(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            source: BarSource::Bars(bars),
        }
    }
}

/// Result for one symbol.
#[derive(Debug)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub result: Result<AnalysisReport, RunError>,
}

/// One row of the batch overview table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub symbol: String,
    pub signal: Option<SignalType>,
    pub composite_score: Option<f64>,
    pub confidence: Option<f64>,
    pub state_id: Option<usize>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// All outcomes of a batch, in job order.
#[derive(Debug)]
pub struct BatchResult {
    pub outcomes: Vec<SymbolOutcome>,
}

impl BatchResult {
    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &AnalysisReport)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|r| (o.symbol.as_str(), r)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &RunError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.symbol.as_str(), e)))
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    pub fn summary(&self) -> Vec<SummaryRow> {
        self.outcomes
            .iter()
            .map(|o| match &o.result {
                Ok(report) => {
                    let signal = &report.latest_signal;
                    SummaryRow {
                        symbol: o.symbol.clone(),
                        signal: Some(signal.signal_type),
                        composite_score: Some(signal.composite_score),
                        confidence: Some(signal.confidence),
                        state_id: Some(report.current_state.state_id),
                        state: Some(report.current_state.characteristics.description.clone()),
                        error: None,
                    }
                }
                Err(e) => SummaryRow {
                    symbol: o.symbol.clone(),
                    signal: None,
                    composite_score: None,
                    confidence: None,
                    state_id: None,
                    state: None,
                    error: Some(e.to_string()),
                },
            })
            .collect()
    }
}

/// Analyze one symbol's bars.
pub fn analyze_symbol(
    symbol: &str,
    bars: &[Bar],
    config: &AnalysisConfig,
) -> Result<AnalysisReport, RunError> {
    let span = tracing::info_span!("analyze_symbol", symbol);
    let _guard = span.enter();
    Ok(analyze(bars, config)?)
}

/// Load a CSV and analyze it. Returns the symbol derived from the file name.
pub fn analyze_file(
    path: &Path,
    config: &AnalysisConfig,
) -> Result<(String, AnalysisReport), RunError> {
    let symbol = symbol_from_path(path);
    let bars = load_bars_csv(path)?;
    let report = analyze_symbol(&symbol, &bars, config)?;
    Ok((symbol, report))
}

/// Runs batches of jobs, in parallel by default.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    config: AnalysisConfig,
    parallel: bool,
}

impl BatchRunner {
    /// Validates the config once up front; every job then gets its own copy.
    pub fn new(config: AnalysisConfig) -> Result<Self, RunError> {
        config.validate()?;
        Ok(Self {
            config,
            parallel: true,
        })
    }

    /// Enable or disable rayon parallelism. Sequential runs produce
    /// identical outcomes; the switch exists for profiling and debugging.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run(&self, jobs: Vec<BatchJob>) -> BatchResult {
        tracing::info!(jobs = jobs.len(), parallel = self.parallel, "batch started");

        let outcomes: Vec<SymbolOutcome> = if self.parallel {
            jobs.into_par_iter()
                .map(|job| run_job(job, self.config.clone()))
                .collect()
        } else {
            jobs.into_iter()
                .map(|job| run_job(job, self.config.clone()))
                .collect()
        };

        let result = BatchResult { outcomes };
        for (symbol, err) in result.failed() {
            tracing::warn!(symbol, error = %err, "symbol failed");
        }
        tracing::info!(
            ok = result.outcomes.len() - result.failure_count(),
            failed = result.failure_count(),
            "batch finished"
        );
        result
    }
}

fn run_job(job: BatchJob, config: AnalysisConfig) -> SymbolOutcome {
    let result = match job.source {
        BarSource::Csv(path) => load_bars_csv(&path)
            .map_err(RunError::from)
            .and_then(|bars| analyze_symbol(&job.symbol, &bars, &config)),
        BarSource::Bars(bars) => analyze_symbol(&job.symbol, &bars, &config),
    };
    SymbolOutcome {
        symbol: job.symbol,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{generate, SyntheticKind};

    fn jobs() -> Vec<BatchJob> {
        vec![
            BatchJob::from_bars("UP", generate(SyntheticKind::Trending, 200, 1)),
            BatchJob::from_bars("DOWN", generate(SyntheticKind::Falling, 200, 1)),
            BatchJob::from_bars("SHORT", generate(SyntheticKind::Trending, 10, 1)),
            BatchJob::from_bars("WAVE", generate(SyntheticKind::RangeBound, 200, 1)),
        ]
    }

    #[test]
    fn failure_is_isolated_to_its_symbol() {
        let runner = BatchRunner::new(AnalysisConfig::default()).unwrap();
        let result = runner.run(jobs());

        assert_eq!(result.outcomes.len(), 4);
        assert_eq!(result.failure_count(), 1);
        let (symbol, err) = result.failed().next().unwrap();
        assert_eq!(symbol, "SHORT");
        assert!(matches!(
            err,
            RunError::Engine(EngineError::InsufficientData { actual: 10, .. })
        ));
        assert_eq!(result.succeeded().count(), 3);
    }

    #[test]
    fn outcomes_keep_job_order() {
        let runner = BatchRunner::new(AnalysisConfig::default()).unwrap();
        let symbols: Vec<_> = runner
            .run(jobs())
            .outcomes
            .into_iter()
            .map(|o| o.symbol)
            .collect();
        assert_eq!(symbols, vec!["UP", "DOWN", "SHORT", "WAVE"]);
    }

    #[test]
    fn parallel_matches_sequential() {
        let runner = BatchRunner::new(AnalysisConfig::default()).unwrap();
        let parallel = runner.run(jobs()).summary();
        let sequential = runner.clone().with_parallelism(false).run(jobs()).summary();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn batch_matches_single_symbol_analysis() {
        let config = AnalysisConfig::default();
        let bars = generate(SyntheticKind::TwoRegime, 300, 9);
        let single = analyze_symbol("X", &bars, &config).unwrap();

        let runner = BatchRunner::new(config).unwrap();
        let result = runner.run(vec![BatchJob::from_bars("X", bars)]);
        let (_, batched) = result.succeeded().next().unwrap();
        assert_eq!(
            batched.to_json_pretty().unwrap(),
            single.to_json_pretty().unwrap()
        );
    }

    #[test]
    fn summary_carries_error_text() {
        let runner = BatchRunner::new(AnalysisConfig::default()).unwrap();
        let rows = runner.run(jobs()).summary();
        let short = rows.iter().find(|r| r.symbol == "SHORT").unwrap();
        assert!(short.signal.is_none());
        assert!(short.error.as_deref().unwrap().contains("insufficient data"));
        let up = rows.iter().find(|r| r.symbol == "UP").unwrap();
        assert!(up.error.is_none());
        assert!(up.signal.is_some());
    }

    #[test]
    fn missing_file_is_a_load_failure() {
        let runner = BatchRunner::new(AnalysisConfig::default()).unwrap();
        let result = runner.run(vec![BatchJob::from_csv(Path::new("/nope/ghost.csv"))]);
        assert_eq!(result.outcomes[0].symbol, "GHOST");
        assert!(matches!(
            result.outcomes[0].result,
            Err(RunError::Load(LoadError::Io { .. }))
        ));
    }

    #[test]
    fn invalid_config_rejected_up_front() {
        let config = AnalysisConfig {
            num_states: 1,
            ..Default::default()
        };
        assert!(matches!(
            BatchRunner::new(config),
            Err(RunError::Engine(EngineError::InvalidConfiguration(_)))
        ));
    }
}
