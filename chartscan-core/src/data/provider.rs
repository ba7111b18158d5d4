//! Series source trait and structured error types.
//!
//! The `SeriesSource` trait abstracts over where bar history lives (Parquet
//! store, in-memory fixtures) so batch jobs can be run against either.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, SymbolKey};

/// One stored daily row, before preparation. Any OHLCV field may be null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl RawRow {
    /// Name of the first null OHLCV field, if any.
    pub fn first_null(&self) -> Option<&'static str> {
        if self.open.is_none() {
            Some("open")
        } else if self.high.is_none() {
            Some("high")
        } else if self.low.is_none() {
            Some("low")
        } else if self.close.is_none() {
            Some("close")
        } else if self.volume.is_none() {
            Some("volume")
        } else {
            None
        }
    }

    /// The complete bar, or `None` if any field is null.
    pub fn to_bar(&self) -> Option<Bar> {
        Some(Bar {
            date: self.date,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            volume: self.volume?,
        })
    }
}

impl From<Bar> for RawRow {
    fn from(bar: Bar) -> Self {
        Self {
            date: bar.date,
            open: Some(bar.open),
            high: Some(bar.high),
            low: Some(bar.low),
            close: Some(bar.close),
            volume: Some(bar.volume),
        }
    }
}

/// Failures reaching the series source. Fatal for the symbol being
/// processed, never for a whole batch.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("series source unreachable: {0}")]
    Unreachable(String),

    #[error("symbol not found: {key}")]
    SymbolNotFound { key: SymbolKey },

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Where bar history comes from.
///
/// Rows returned by `fetch` are ordered by date and deduplicated by the
/// source, but may still contain nulls; run them through
/// [`crate::data::prepare`] before handing them to a detector.
pub trait SeriesSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// All instruments listed for the given countries.
    fn list_symbols(&self, countries: &[String]) -> Result<Vec<SymbolKey>, SourceError>;

    /// Daily rows for one instrument, optionally bounded by inclusive dates.
    fn fetch(
        &self,
        key: &SymbolKey,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<RawRow>, SourceError>;
}

/// True if `date` lies inside the optional inclusive bounds.
pub(crate) fn within(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
}
