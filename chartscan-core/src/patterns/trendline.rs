//! Trend lines through the two most recent pivots of one side.
//!
//! Lines are fitted on the date-ordinal axis, so calendar gaps count.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::pivot::{Pivot, PivotKind};
use crate::domain::bar::date_ordinal;
use crate::error::DetectError;

/// Which pivots a line is drawn through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotSide {
    High,
    Low,
}

impl PivotSide {
    fn kind(self) -> PivotKind {
        match self {
            PivotSide::High => PivotKind::High,
            PivotSide::Low => PivotKind::Low,
        }
    }
}

/// A line anchor: a dated price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    /// Older anchor first.
    pub anchors: [Anchor; 2],
    pub slope: f64,
    pub intercept: f64,
}

impl TrendLine {
    /// Line through two anchors. Anchors on the same date cannot define a line.
    pub fn through(a: Anchor, b: Anchor) -> Result<Self, DetectError> {
        let (older, newer) = if a.date <= b.date { (a, b) } else { (b, a) };
        let x1 = date_ordinal(older.date);
        let x2 = date_ordinal(newer.date);
        if x1 == x2 {
            return Err(DetectError::DegenerateFit { date: older.date });
        }
        let slope = (newer.price - older.price) / (x2 - x1) as f64;
        let intercept = older.price - slope * x1 as f64;
        Ok(Self {
            anchors: [older, newer],
            slope,
            intercept,
        })
    }

    /// Projected price on `date`.
    pub fn price_at(&self, date: NaiveDate) -> f64 {
        self.slope * date_ordinal(date) as f64 + self.intercept
    }
}

/// Fit a line through the two most recent pivots of `side`.
///
/// Returns `Ok(None)` when fewer than two such pivots exist. BOTH pivots are
/// not counted on either side.
pub fn build_trend_line(pivots: &[Pivot], side: PivotSide) -> Result<Option<TrendLine>, DetectError> {
    let kind = side.kind();
    let mut recent: Vec<&Pivot> = pivots.iter().filter(|p| p.kind == kind).collect();
    if recent.len() < 2 {
        return Ok(None);
    }
    recent.sort_by(|a, b| b.date.cmp(&a.date));

    let anchor = |p: &Pivot| Anchor {
        date: p.date,
        price: match side {
            PivotSide::High => p.high,
            PivotSide::Low => p.low,
        },
    };
    TrendLine::through(anchor(recent[1]), anchor(recent[0])).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn pivot(day: u32, kind: PivotKind, low: f64, high: f64) -> Pivot {
        Pivot {
            position: day as usize,
            date: date(day),
            kind,
            low,
            high,
        }
    }

    #[test]
    fn line_through_two_points() {
        let line = TrendLine::through(
            Anchor { date: date(1), price: 100.0 },
            Anchor { date: date(11), price: 90.0 },
        )
        .unwrap();
        assert_approx(line.slope, -1.0, DEFAULT_EPSILON);
        assert_approx(line.price_at(date(21)), 80.0, 1e-6);
        assert_approx(line.price_at(date(1)), 100.0, 1e-6);
    }

    #[test]
    fn anchor_order_does_not_matter() {
        let a = Anchor { date: date(3), price: 50.0 };
        let b = Anchor { date: date(8), price: 55.0 };
        assert_eq!(TrendLine::through(a, b).unwrap(), TrendLine::through(b, a).unwrap());
    }

    #[test]
    fn same_date_is_degenerate() {
        let a = Anchor { date: date(3), price: 50.0 };
        let b = Anchor { date: date(3), price: 52.0 };
        assert_eq!(
            TrendLine::through(a, b),
            Err(DetectError::DegenerateFit { date: date(3) })
        );
    }

    #[test]
    fn uses_two_most_recent_high_pivots() {
        let pivots = vec![
            pivot(1, PivotKind::High, 0.0, 200.0),
            pivot(5, PivotKind::Low, 80.0, 0.0),
            pivot(10, PivotKind::High, 0.0, 120.0),
            pivot(12, PivotKind::Both, 70.0, 130.0),
            pivot(20, PivotKind::High, 0.0, 110.0),
        ];
        let line = build_trend_line(&pivots, PivotSide::High).unwrap().unwrap();
        assert_eq!(line.anchors[0].date, date(10));
        assert_eq!(line.anchors[1].date, date(20));
        assert_approx(line.price_at(date(30)), 100.0, 1e-6);
    }

    #[test]
    fn fewer_than_two_pivots_is_no_line() {
        let pivots = vec![pivot(1, PivotKind::Low, 10.0, 0.0), pivot(4, PivotKind::High, 0.0, 12.0)];
        assert_eq!(build_trend_line(&pivots, PivotSide::Low), Ok(None));
        assert_eq!(build_trend_line(&[], PivotSide::High), Ok(None));
    }
}
