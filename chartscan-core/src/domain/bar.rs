//! Bar — one trading day for one instrument.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar. Immutable once ingested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Basic OHLC sanity check: positive prices and `low <= open,close <= high`.
    pub fn is_sane(&self) -> bool {
        let finite = self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite();
        finite
            && self.low > 0.0
            && self.high >= self.low
            && self.open >= self.low
            && self.open <= self.high
            && self.close >= self.low
            && self.close <= self.high
    }

    /// Proleptic Gregorian ordinal of the bar date (0001-01-01 is day 1).
    ///
    /// Trend lines are fitted on this axis, so weekends and holidays count as
    /// elapsed days.
    pub fn ordinal(&self) -> i64 {
        date_ordinal(self.date)
    }
}

/// Proleptic Gregorian ordinal of a date (0001-01-01 is day 1).
pub fn date_ordinal(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64
}
