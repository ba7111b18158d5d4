//! Series — the ordered bar history of one `(symbol, country)` pair.
//!
//! Bars are addressed by a dense 0-based position, distinct from the date
//! key. Positions are the only scheme window lookups use.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::bar::Bar;
use crate::error::DetectError;

/// Identity of an instrument within a country listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolKey {
    pub symbol: String,
    pub country: String,
}

impl SymbolKey {
    pub fn new(symbol: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            country: country.into(),
        }
    }

    /// True if `countries` is empty (unscoped) or lists this key's country.
    pub fn in_scope(&self, countries: &[String]) -> bool {
        countries.is_empty() || countries.iter().any(|c| c == &self.country)
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.country, self.symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("bar dates must be strictly increasing (position {position}, date {date})")]
    Unordered { position: usize, date: NaiveDate },
}

/// Ascending, duplicate-free bar history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    key: SymbolKey,
    bars: Vec<Bar>,
}

impl Series {
    /// Build a series from bars already sorted by strictly increasing date.
    pub fn new(key: SymbolKey, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        if let Some(i) = bars.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(SeriesError::Unordered {
                position: i + 1,
                date: bars[i + 1].date,
            });
        }
        Ok(Self { key, bars })
    }

    /// Caller guarantees the ordering invariant.
    pub(crate) fn from_ordered(key: SymbolKey, bars: Vec<Bar>) -> Self {
        debug_assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
        Self { key, bars }
    }

    pub fn key(&self) -> &SymbolKey {
        &self.key
    }

    pub fn symbol(&self) -> &str {
        &self.key.symbol
    }

    pub fn country(&self) -> &str {
        &self.key.country
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Bar> {
        self.bars.get(position)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Fail with `InsufficientData` unless the series has at least `required` bars.
    pub fn require(&self, detector: &'static str, required: usize) -> Result<(), DetectError> {
        if self.bars.len() < required {
            return Err(DetectError::insufficient(detector, required, self.bars.len()));
        }
        Ok(())
    }

    /// The prefix ending at `position` (inclusive). Used to evaluate a bar
    /// without look-ahead.
    pub fn truncated(&self, position: usize) -> Series {
        let end = (position + 1).min(self.bars.len());
        Series {
            key: self.key.clone(),
            bars: self.bars[..end].to_vec(),
        }
    }

    /// Bars dated on or after `start`.
    pub fn since(&self, start: NaiveDate) -> Series {
        let from = self.bars.partition_point(|b| b.date < start);
        Series {
            key: self.key.clone(),
            bars: self.bars[from..].to_vec(),
        }
    }
}
