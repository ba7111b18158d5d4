//! Detector error taxonomy.
//!
//! "No pattern found" is never an error: detectors return a false-valued or
//! `None` result for that. Errors are reserved for inputs a detector cannot
//! judge at all.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    /// The series is shorter than the detector's stated minimum.
    #[error("{detector}: insufficient data ({actual} bars, need at least {required})")]
    InsufficientData {
        detector: &'static str,
        required: usize,
        actual: usize,
    },

    /// A two-point line fit whose anchors share an x coordinate.
    #[error("degenerate trend-line fit: both anchors fall on {date}")]
    DegenerateFit { date: NaiveDate },
}

impl DetectError {
    pub fn insufficient(detector: &'static str, required: usize, actual: usize) -> Self {
        Self::InsufficientData {
            detector,
            required,
            actual,
        }
    }

    /// True for errors that mean "skip this symbol", as opposed to a fault.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
