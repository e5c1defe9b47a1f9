//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: the full report with `schema_version`; unknown (newer)
//!   versions are rejected on load.
//! - **CSV**: the signal tape, the state table, and the batch overview.
//! - **Markdown**: a human-readable single-symbol summary.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use statelab_core::domain::{Signal, State};
use statelab_core::{AnalysisReport, SCHEMA_VERSION};

use crate::batch::SummaryRow;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a report to pretty JSON.
pub fn export_json(report: &AnalysisReport) -> Result<String> {
    report
        .to_json_pretty()
        .context("failed to serialize AnalysisReport to JSON")
}

/// Deserialize a report from JSON, rejecting unknown schema versions.
///
/// The full indicator series is not persisted and comes back empty.
pub fn import_json(json: &str) -> Result<AnalysisReport> {
    let report: AnalysisReport =
        serde_json::from_str(json).context("failed to deserialize AnalysisReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn contributing_list(signal: &Signal) -> String {
    signal
        .contributing_indicators
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

/// Export a signal sequence as CSV.
///
/// Columns: timestamp, bar_index, signal, composite_score, confidence,
/// state_id, state, contributing
pub fn export_signals_csv(signals: &[Signal]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "bar_index",
        "signal",
        "composite_score",
        "confidence",
        "state_id",
        "state",
        "contributing",
    ])?;

    for s in signals {
        wtr.write_record([
            s.timestamp.to_string(),
            s.bar_index.to_string(),
            s.signal_type.as_str().to_string(),
            format!("{:.6}", s.composite_score),
            format!("{:.6}", s.confidence),
            s.state_context.state_id.to_string(),
            s.state_context.characteristics.description.clone(),
            contributing_list(s),
        ])?;
    }
    finish_csv(wtr)
}

/// Export the state table as CSV, one row per state.
pub fn export_states_csv(states: &[State]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "state_id",
        "description",
        "confidence",
        "member_count",
        "member_fraction",
        "volatility",
        "trend_strength",
        "volume_ratio",
        "return_dispersion",
        "relative_volatility",
    ])?;

    for s in states {
        let c = &s.characteristics;
        wtr.write_record([
            s.state_id.to_string(),
            c.description.clone(),
            format!("{:.6}", s.confidence),
            s.member_count.to_string(),
            format!("{:.6}", s.member_fraction),
            format!("{:.8}", c.volatility),
            format!("{:.6}", c.trend_strength),
            format!("{:.6}", c.volume_ratio),
            format!("{:.8}", c.return_dispersion),
            format!("{:.6}", c.relative_volatility),
        ])?;
    }
    finish_csv(wtr)
}

/// Export a batch overview as CSV. Failed symbols keep their row with the
/// error text and empty result columns.
pub fn export_summary_csv(rows: &[SummaryRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "signal",
        "composite_score",
        "confidence",
        "state_id",
        "state",
        "error",
    ])?;

    for r in rows {
        wtr.write_record([
            r.symbol.clone(),
            r.signal.map(|s| s.as_str().to_string()).unwrap_or_default(),
            r.composite_score
                .map(|v| format!("{v:.6}"))
                .unwrap_or_default(),
            r.confidence.map(|v| format!("{v:.6}")).unwrap_or_default(),
            r.state_id.map(|v| v.to_string()).unwrap_or_default(),
            r.state.clone().unwrap_or_default(),
            r.error.clone().unwrap_or_default(),
        ])?;
    }
    finish_csv(wtr)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Markdown summary of one report.
pub fn generate_report(symbol: &str, report: &AnalysisReport) -> String {
    let signal = &report.latest_signal;
    let state = &report.current_state;
    let mut md = String::new();

    md.push_str(&format!("# {symbol}: {}\n\n", signal.signal_type.as_str()));
    md.push_str(&format!(
        "Bars {} to {} ({} bars). Config `{}`.\n\n",
        report.first_timestamp,
        report.last_timestamp,
        report.bar_count,
        &report.config_fingerprint[..report.config_fingerprint.len().min(12)],
    ));

    md.push_str("## Latest Signal\n\n");
    md.push_str("| Field | Value |\n|-------|-------|\n");
    md.push_str(&format!("| Timestamp | {} |\n", signal.timestamp));
    md.push_str(&format!("| Composite score | {:.4} |\n", signal.composite_score));
    md.push_str(&format!("| Confidence | {:.4} |\n", signal.confidence));
    md.push_str(&format!("| Contributing | {} |\n", contributing_list(signal)));
    md.push_str(&format!(
        "| State | {} ({}) |\n\n",
        state.state_id, state.characteristics.description
    ));

    md.push_str("## Indicators\n\n");
    md.push_str("| Indicator | Value | Lower | Upper | Weight | Vote |\n");
    md.push_str("|-----------|-------|-------|-------|--------|------|\n");
    for r in &report.indicator_snapshot {
        let fmt_opt = |v: Option<f64>| v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "n/a".into());
        md.push_str(&format!(
            "| {} | {} | {} | {} | {:.4} | {:+} |\n",
            r.indicator,
            fmt_opt(r.value),
            fmt_opt(r.lower_threshold),
            fmt_opt(r.upper_threshold),
            r.weight,
            r.vote,
        ));
    }
    md.push('\n');

    md.push_str("## States\n\n");
    if report.degenerate {
        md.push_str("Feature matrix had no usable variance; a single fallback state was used.\n\n");
    }
    md.push_str("| Id | Description | Confidence | Members | Volatility | Trend |\n");
    md.push_str("|----|-------------|------------|---------|------------|-------|\n");
    for s in &report.states {
        md.push_str(&format!(
            "| {} | {} | {:.3} | {} ({:.1}%) | {:.5} | {:+.3} |\n",
            s.state_id,
            s.characteristics.description,
            s.confidence,
            s.member_count,
            s.member_fraction * 100.0,
            s.characteristics.volatility,
            s.characteristics.trend_strength,
        ));
    }
    md.push_str(&format!("\nState transitions: {}\n", report.transition_count));

    if let Some(pca) = &report.pca {
        md.push_str(&format!(
            "\nPCA: {} component(s), cumulative explained variance {:.1}%\n",
            pca.n_components,
            pca.cumulative_explained_variance * 100.0,
        ));
    }

    if !report.history.is_empty() {
        use statelab_core::SignalType;
        md.push_str(&format!(
            "\nHistory: {} signals ({} BUY, {} SELL, {} HOLD)\n",
            report.history.len(),
            report.count(SignalType::Buy),
            report.count(SignalType::Sell),
            report.count(SignalType::Hold),
        ));
    }

    md
}

// ─── Artifact directory ─────────────────────────────────────────────

/// Write all artifacts for one symbol into `output_dir/<symbol>/`.
///
/// Files: `report.json`, `signals.csv`, `states.csv`, `summary.md`.
/// Returns the directory written to.
pub fn save_artifacts(symbol: &str, report: &AnalysisReport, output_dir: &Path) -> Result<PathBuf> {
    let dir = output_dir.join(symbol);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let write = |name: &str, content: String| -> Result<()> {
        let path = dir.join(name);
        std::fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))
    };

    write("report.json", export_json(report)?)?;
    // The tape falls back to the latest signal when history was disabled.
    let tape = if report.history.is_empty() {
        std::slice::from_ref(&report.latest_signal)
    } else {
        &report.history[..]
    };
    write("signals.csv", export_signals_csv(tape)?)?;
    write("states.csv", export_states_csv(&report.states)?)?;
    write("summary.md", generate_report(symbol, report))?;

    tracing::debug!(symbol, dir = %dir.display(), "artifacts saved");
    Ok(dir)
}
