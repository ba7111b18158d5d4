//! CSV import into the Parquet series store.
//!
//! Expected header: `date,open,high,low,close,volume`. Dates are ISO
//! (`YYYY-MM-DD`); empty cells become nulls and are dropped later by
//! preparation.

use std::io::Read;
use std::path::{Path, PathBuf};

use chartscan_core::data::{ParquetStore, RawRow, SourceError};
use chartscan_core::domain::SymbolKey;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {reason}")]
    Row { line: u64, reason: String },
    #[error("no rows in input")]
    Empty,
    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

/// Parse CSV rows. Malformed dates and negative volumes are errors.
pub fn read_csv(reader: impl Read) -> Result<Vec<RawRow>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for record in rdr.deserialize::<CsvRow>() {
        let row = record?;
        let line = rows.len() as u64 + 2;
        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| ImportError::Row {
            line,
            reason: format!("bad date '{}': {e}", row.date),
        })?;
        let volume = match row.volume {
            Some(v) if v.is_finite() && v >= 0.0 => Some(v.round() as u64),
            Some(v) => {
                return Err(ImportError::Row {
                    line,
                    reason: format!("bad volume {v}"),
                })
            }
            None => None,
        };
        rows.push(RawRow {
            date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume,
        });
    }
    Ok(rows)
}

/// Import a CSV file for `key` into `store`. Returns the number of rows read.
pub fn import_csv(path: &Path, store: &ParquetStore, key: &SymbolKey) -> Result<usize, ImportError> {
    let file = std::fs::File::open(path).map_err(|source| ImportError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = read_csv(file)?;
    if rows.is_empty() {
        return Err(ImportError::Empty);
    }
    store.write(key, &rows)?;
    info!(symbol = %key, rows = rows.len(), path = %path.display(), "imported");
    Ok(rows.len())
}
