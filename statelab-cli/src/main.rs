//! StateLab CLI: analyze, batch, and config commands.
//!
//! Commands:
//! - `analyze` — run the state-aware signal engine on one CSV or synthetic series
//! - `batch` — analyze every CSV in a directory in parallel
//! - `config` — print (or write) the default configuration as TOML
//!
//! Logs go to stderr; stdout carries only the requested output so JSON can
//! be piped straight into other tools.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use statelab_core::config::{MAX_STATES, MIN_STATES};
use statelab_core::AnalysisConfig;
use statelab_runner::{
    analyze_symbol, dataset_hash, default_config_toml, discover_csv_files, export_json,
    export_summary_csv, generate, generate_report, load_bars_csv, load_config, save_artifacts,
    symbol_from_path, BatchJob, BatchRunner, SyntheticKind,
};

#[derive(Parser)]
#[command(
    name = "statelab",
    version,
    about = "StateLab CLI — state-aware technical signal engine"
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Markdown summary.
    Summary,
    /// Full report as pretty JSON.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one bar series and print the latest signal.
    Analyze {
        /// CSV file with date, open, high, low, close, volume columns.
        #[arg(long, conflicts_with = "synthetic", required_unless_present = "synthetic")]
        bars: Option<PathBuf>,

        /// Generate a synthetic series instead: trending, falling, range_bound, two_regime, random_walk.
        #[arg(long)]
        synthetic: Option<SyntheticKind>,

        /// Synthetic series length.
        #[arg(long, default_value_t = 500)]
        len: usize,

        /// Synthetic series seed.
        #[arg(long, default_value_t = 1)]
        data_seed: u64,

        /// Path to a TOML config file. Defaults to built-in settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the number of market states.
        #[arg(long)]
        states: Option<usize>,

        /// Symbol label. Defaults to the CSV file stem or the series kind.
        #[arg(long)]
        symbol: Option<String>,

        /// Only compute the latest signal, skip history reconstruction.
        #[arg(long, default_value_t = false)]
        latest_only: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
        format: OutputFormat,

        /// Also write report.json, signals.csv, states.csv, summary.md here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Analyze every CSV file in a directory.
    Batch {
        /// Directory of CSV files; each file stem is the symbol.
        #[arg(long)]
        dir: PathBuf,

        /// Path to a TOML config file. Defaults to built-in settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the number of market states.
        #[arg(long)]
        states: Option<usize>,

        /// Run symbols one at a time instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Write per-symbol artifacts and summary.csv here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the default configuration as TOML.
    Config {
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            bars,
            synthetic,
            len,
            data_seed,
            config,
            states,
            symbol,
            latest_only,
            format,
            output_dir,
        } => {
            let source = match (bars, synthetic) {
                (Some(path), _) => Source::Csv(path),
                (None, Some(kind)) => Source::Synthetic {
                    kind,
                    len,
                    seed: data_seed,
                },
                (None, None) => bail!("one of --bars or --synthetic is required"),
            };
            let mut config = build_config(config.as_deref(), states)?;
            if latest_only {
                config.signal.include_history = false;
            }
            run_analyze(source, &config, symbol, format, output_dir.as_deref())
        }
        Commands::Batch {
            dir,
            config,
            states,
            sequential,
            output_dir,
        } => {
            let config = build_config(config.as_deref(), states)?;
            run_batch(&dir, config, sequential, output_dir.as_deref())
        }
        Commands::Config { output } => run_config(output.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "statelab=debug" } else { "statelab=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(path: Option<&Path>, states: Option<usize>) -> Result<AnalysisConfig> {
    let mut config = match path {
        Some(p) => load_config(p).with_context(|| format!("loading config {}", p.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(n) = states {
        if !(MIN_STATES..=MAX_STATES).contains(&n) {
            bail!("--states must be between {MIN_STATES} and {MAX_STATES}, got {n}");
        }
        config.num_states = n;
    }
    Ok(config)
}

enum Source {
    Csv(PathBuf),
    Synthetic {
        kind: SyntheticKind,
        len: usize,
        seed: u64,
    },
}

fn run_analyze(
    source: Source,
    config: &AnalysisConfig,
    symbol: Option<String>,
    format: OutputFormat,
    output_dir: Option<&Path>,
) -> Result<()> {
    let (default_symbol, bars) = match &source {
        Source::Csv(path) => (
            symbol_from_path(path),
            load_bars_csv(path).with_context(|| format!("loading bars from {}", path.display()))?,
        ),
        Source::Synthetic { kind, len, seed } => {
            tracing::warn!(%kind, len = *len, seed = *seed, "using synthetic data");
            (kind.as_str().to_uppercase(), generate(*kind, *len, *seed))
        }
    };
    let symbol = symbol.unwrap_or(default_symbol);
    tracing::debug!(%symbol, dataset = %dataset_hash(&bars), "input ready");

    let report = analyze_symbol(&symbol, &bars, config)
        .with_context(|| format!("analysis failed for {symbol}"))?;

    match format {
        OutputFormat::Json => println!("{}", export_json(&report)?),
        OutputFormat::Summary => print!("{}", generate_report(&symbol, &report)),
    }

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&symbol, &report, dir)?;
        eprintln!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_batch(
    dir: &Path,
    config: AnalysisConfig,
    sequential: bool,
    output_dir: Option<&Path>,
) -> Result<()> {
    let files = discover_csv_files(dir)
        .with_context(|| format!("scanning {} for CSV files", dir.display()))?;
    if files.is_empty() {
        bail!("no CSV files found in {}", dir.display());
    }

    let runner = BatchRunner::new(config)?.with_parallelism(!sequential);
    let jobs = files.iter().map(|p| BatchJob::from_csv(p)).collect();
    let result = runner.run(jobs);

    print_batch_table(&result.summary());

    if let Some(out) = output_dir {
        std::fs::create_dir_all(out)
            .with_context(|| format!("failed to create {}", out.display()))?;
        for (symbol, report) in result.succeeded() {
            save_artifacts(symbol, report, out)?;
        }
        let summary_path = out.join("summary.csv");
        std::fs::write(&summary_path, export_summary_csv(&result.summary())?)
            .with_context(|| format!("failed to write {}", summary_path.display()))?;
        eprintln!("Artifacts saved to: {}", out.display());
    }

    let failures = result.failure_count();
    if failures > 0 {
        for (symbol, err) in result.failed() {
            eprintln!("Error for {symbol}: {err}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn print_batch_table(rows: &[statelab_runner::SummaryRow]) {
    println!(
        "{:<10} {:<6} {:>9} {:>10}  {}",
        "SYMBOL", "SIGNAL", "SCORE", "CONFIDENCE", "STATE"
    );
    for r in rows {
        match (&r.signal, &r.error) {
            (Some(signal), _) => println!(
                "{:<10} {:<6} {:>+9.4} {:>10.4}  {}",
                r.symbol,
                signal.as_str(),
                r.composite_score.unwrap_or(0.0),
                r.confidence.unwrap_or(0.0),
                r.state.as_deref().unwrap_or(""),
            ),
            (None, err) => println!(
                "{:<10} {:<6} {:>9} {:>10}  {}",
                r.symbol,
                "ERROR",
                "-",
                "-",
                err.as_deref().unwrap_or("unknown error"),
            ),
        }
    }
}

fn run_config(output: Option<&Path>) -> Result<()> {
    let toml = default_config_toml()?;
    match output {
        Some(path) => {
            std::fs::write(path, &toml)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Default config written to: {}", path.display());
        }
        None => print!("{toml}"),
    }
    Ok(())
}
