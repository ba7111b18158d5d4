//! Series preparation: turn raw stored rows into a canonical [`Series`].
//!
//! Steps, in order:
//! 1. drop exact-duplicate rows
//! 2. drop rows with a null OHLCV field
//! 3. drop rows that fail the OHLC sanity check
//! 4. sort ascending by date (stable)
//! 5. keep the first row of any remaining same-date group
//!
//! Every dropped row yields a [`DataIntegrityWarning`]. Warnings are
//! non-fatal: preparation always produces a series, possibly empty.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

use super::provider::RawRow;
use crate::domain::{Bar, Series, SymbolKey};

/// A row dropped during preparation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataIntegrityWarning {
    DuplicateRow { date: NaiveDate },
    NullField { date: NaiveDate, field: String },
    InvalidBar { date: NaiveDate },
    ConflictingDate { date: NaiveDate },
}

impl fmt::Display for DataIntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRow { date } => write!(f, "{date}: exact duplicate row dropped"),
            Self::NullField { date, field } => write!(f, "{date}: null {field}, row dropped"),
            Self::InvalidBar { date } => write!(f, "{date}: OHLC sanity check failed, row dropped"),
            Self::ConflictingDate { date } => {
                write!(f, "{date}: second row for the same date dropped")
            }
        }
    }
}

/// Output of [`prepare`].
#[derive(Debug, Clone)]
pub struct Prepared {
    pub series: Series,
    pub warnings: Vec<DataIntegrityWarning>,
}

type RowKey = (NaiveDate, [Option<u64>; 4], Option<u64>);

fn row_key(row: &RawRow) -> RowKey {
    let bits = |v: Option<f64>| v.map(f64::to_bits);
    (
        row.date,
        [bits(row.open), bits(row.high), bits(row.low), bits(row.close)],
        row.volume,
    )
}

/// Prepare raw rows for `key` into a canonical series.
pub fn prepare(key: SymbolKey, rows: Vec<RawRow>) -> Prepared {
    let total = rows.len();
    let mut warnings = Vec::new();
    let mut seen: HashSet<RowKey> = HashSet::with_capacity(rows.len());
    let mut bars: Vec<Bar> = Vec::with_capacity(rows.len());

    for row in rows {
        if !seen.insert(row_key(&row)) {
            warnings.push(DataIntegrityWarning::DuplicateRow { date: row.date });
            continue;
        }
        if let Some(field) = row.first_null() {
            warnings.push(DataIntegrityWarning::NullField {
                date: row.date,
                field: field.to_string(),
            });
            continue;
        }
        match row.to_bar() {
            Some(bar) if bar.is_sane() => bars.push(bar),
            _ => warnings.push(DataIntegrityWarning::InvalidBar { date: row.date }),
        }
    }

    bars.sort_by_key(|b| b.date);

    let mut ordered: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match ordered.last() {
            Some(prev) if prev.date == bar.date => {
                warnings.push(DataIntegrityWarning::ConflictingDate { date: bar.date });
            }
            _ => ordered.push(bar),
        }
    }

    if !warnings.is_empty() {
        warn!(
            symbol = %key,
            dropped = warnings.len(),
            total,
            "data integrity: rows dropped during preparation"
        );
        for w in &warnings {
            debug!(symbol = %key, "{w}");
        }
    }

    Prepared {
        series: Series::from_ordered(key, ordered),
        warnings,
    }
}
