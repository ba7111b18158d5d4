//! Windowed pivot extraction.
//!
//! A bar is a LOW pivot when its low is at or below every low in the closed
//! window `[position - before, position + after]`, a HIGH pivot when its high
//! is at or above every high there, and BOTH when it is the two at once.
//! Positions without a full window on either side are never pivots.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Series};

/// Classification of a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PivotKind {
    None,
    Low,
    High,
    Both,
}

impl PivotKind {
    fn from_flags(is_low: bool, is_high: bool) -> Self {
        match (is_low, is_high) {
            (true, true) => PivotKind::Both,
            (true, false) => PivotKind::Low,
            (false, true) => PivotKind::High,
            (false, false) => PivotKind::None,
        }
    }
}

/// Neighbour counts compared on each side of a candidate bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotWindow {
    pub before: usize,
    pub after: usize,
}

impl PivotWindow {
    /// Used by buy-signal evaluation and flat level detection.
    pub const WIDE: PivotWindow = PivotWindow::new(10, 10);
    /// Used by zone clustering.
    pub const ZONES: PivotWindow = PivotWindow::new(5, 5);

    pub const fn new(before: usize, after: usize) -> Self {
        Self { before, after }
    }

    /// Smallest series on which at least one position has a full window.
    pub fn span(&self) -> usize {
        self.before + self.after + 1
    }
}

impl Default for PivotWindow {
    fn default() -> Self {
        Self::WIDE
    }
}

/// A bar tagged as a pivot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub position: usize,
    pub date: NaiveDate,
    pub kind: PivotKind,
    pub low: f64,
    pub high: f64,
}

impl Pivot {
    /// Qualifying price: the low of a LOW pivot, the high of a HIGH pivot.
    /// BOTH pivots have no single qualifying price.
    pub fn price(&self) -> Option<f64> {
        match self.kind {
            PivotKind::Low => Some(self.low),
            PivotKind::High => Some(self.high),
            PivotKind::Both | PivotKind::None => None,
        }
    }
}

/// Classify the bar at `position`.
pub fn pivot_at(bars: &[Bar], position: usize, window: PivotWindow) -> PivotKind {
    if position < window.before || position + window.after >= bars.len() {
        return PivotKind::None;
    }
    let candidate = &bars[position];
    let neighbourhood = &bars[position - window.before..=position + window.after];

    let is_low = neighbourhood.iter().all(|b| candidate.low <= b.low);
    let is_high = neighbourhood.iter().all(|b| candidate.high >= b.high);
    PivotKind::from_flags(is_low, is_high)
}

/// Every pivot of the series in position order. NONE positions are omitted.
pub fn find_pivots(series: &Series, window: PivotWindow) -> Vec<Pivot> {
    let bars = series.bars();
    (0..bars.len())
        .filter_map(|position| {
            let kind = pivot_at(bars, position, window);
            if kind == PivotKind::None {
                return None;
            }
            let bar = &bars[position];
            Some(Pivot {
                position,
                date: bar.date,
                kind,
                low: bar.low,
                high: bar.high,
            })
        })
        .collect()
}
