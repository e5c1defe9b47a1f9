//! Bar loading from CSV files.
//!
//! Expected layout: a header row naming at least `date` (or `timestamp`),
//! `open`, `high`, `low`, `close`, `volume`. Header matching is
//! case-insensitive and extra columns (e.g. `adj_close`) are ignored.
//! Timestamps may be plain dates (`2024-01-02`) or date-times
//! (`2024-01-02 09:30:00`, `2024-01-02T09:30:00`).
//!
//! Loaded series are checked against the bar contract before they are
//! returned; out-of-order or malformed rows fail the load rather than being
//! silently repaired.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use statelab_core::domain::{validate_series, Bar, BarError};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{column}'")]
    MissingColumn { column: &'static str },

    #[error("row {row}: cannot parse timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },

    #[error("row {row}: cannot parse {column} value '{value}'")]
    BadNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("no bars found")]
    Empty,

    #[error("bar series rejected: {0}")]
    InvalidBars(#[from] BarError),
}

const TIMESTAMP_ALIASES: [&str; 3] = ["date", "timestamp", "datetime"];
const PRICE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Column positions resolved from the header row.
struct Columns {
    timestamp: usize,
    values: [usize; 5],
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let timestamp = TIMESTAMP_ALIASES
            .iter()
            .find_map(|alias| find(*alias))
            .ok_or(LoadError::MissingColumn { column: "date" })?;

        let mut values = [0usize; 5];
        for (slot, column) in values.iter_mut().zip(PRICE_COLUMNS) {
            *slot = find(column).ok_or(LoadError::MissingColumn { column })?;
        }
        Ok(Self { timestamp, values })
    }
}

/// Parse a timestamp cell. Plain dates map to midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Read bars from any CSV source.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let columns = Columns::resolve(rdr.headers()?)?;

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // 1-based data row, header excluded
        let row = i + 1;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let raw_ts = cell(columns.timestamp);
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::BadTimestamp {
            row,
            value: raw_ts.to_string(),
        })?;

        let mut values = [0.0f64; 5];
        for ((value, &idx), column) in values.iter_mut().zip(&columns.values).zip(PRICE_COLUMNS) {
            let raw = cell(idx);
            *value = raw.parse::<f64>().map_err(|_| LoadError::BadNumber {
                row,
                column,
                value: raw.to_string(),
            })?;
        }
        let [open, high, low, close, volume] = values;

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    validate_series(&bars)?;
    Ok(bars)
}

/// Load bars from a CSV file on disk.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_bars(std::io::BufReader::new(file))?;
    tracing::debug!(path = %path.display(), bars = bars.len(), "loaded bars");
    Ok(bars)
}

/// Symbol name for a bar file: the file stem, upper-cased.
pub fn symbol_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

/// All `.csv` files in a directory, sorted by path.
pub fn discover_csv_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Deterministic BLAKE3 hash over all bar data.
///
/// Identical series hash identically regardless of where they were loaded
/// from; used to tag exported reports with their input.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.and_utc().timestamp().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
