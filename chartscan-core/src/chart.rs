//! Declarative chart payloads for the query surface.
//!
//! A payload lists candles, pivot markers and overlays. How they are drawn is
//! up to the consumer.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::Series;
use crate::patterns::{Level, PivotKind, SupportResistance, TrendLine};

/// Y-axis padding around the plotted extrema.
const Y_PADDING: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub date: NaiveDate,
    pub price: f64,
    pub kind: PivotKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Support,
    Resistance,
    Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Horizontal line across the chart.
    Line {
        role: Role,
        from: NaiveDate,
        to: NaiveDate,
        price: f64,
    },
    /// Horizontal band across the chart.
    Zone {
        role: Role,
        from: NaiveDate,
        to: NaiveDate,
        low: f64,
        high: f64,
    },
    /// Straight segment between two dated prices.
    Segment {
        role: Role,
        from: NaiveDate,
        from_price: f64,
        to: NaiveDate,
        to_price: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    pub title: String,
    pub candles: Vec<Candle>,
    pub markers: Vec<Marker>,
    pub shapes: Vec<Shape>,
    /// `(min, max)` of the y axis.
    pub y_range: (f64, f64),
}

impl ChartPayload {
    /// Payload for `series` with the given levels. A trend line, when given,
    /// is drawn from its older anchor to the last candle.
    pub fn build(
        title: impl Into<String>,
        series: &Series,
        levels: &SupportResistance,
        trend_line: Option<&TrendLine>,
    ) -> Self {
        let candles: Vec<Candle> = series
            .bars()
            .iter()
            .map(|b| Candle {
                date: b.date,
                open: b.open,
                high: b.high,
                low: b.low,
                close: b.close,
            })
            .collect();

        let markers = levels
            .pivots
            .iter()
            .filter_map(|p| {
                p.price().map(|price| Marker {
                    date: p.date,
                    price,
                    kind: p.kind,
                })
            })
            .collect();

        let mut shapes = Vec::new();
        if let (Some(first), Some(last)) = (series.first(), series.last()) {
            let (from, to) = (first.date, last.date);
            shapes.extend(levels.support.iter().map(|l| level_shape(l, Role::Support, from, to)));
            shapes.extend(levels.resistance.iter().map(|l| level_shape(l, Role::Resistance, from, to)));
            if let Some(line) = trend_line {
                let start = line.anchors[0];
                shapes.push(Shape::Segment {
                    role: Role::Trend,
                    from: start.date,
                    from_price: start.price,
                    to,
                    to_price: line.price_at(to),
                });
            }
        }

        let y_range = y_range(&candles);
        Self {
            title: title.into(),
            candles,
            markers,
            shapes,
            y_range,
        }
    }
}

fn level_shape(level: &Level, role: Role, from: NaiveDate, to: NaiveDate) -> Shape {
    if level.is_flat() {
        Shape::Line {
            role,
            from,
            to,
            price: level.mean,
        }
    } else {
        Shape::Zone {
            role,
            from,
            to,
            low: level.low,
            high: level.high,
        }
    }
}

fn y_range(candles: &[Candle]) -> (f64, f64) {
    if candles.is_empty() {
        return (0.0, 0.0);
    }
    let low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    (low * (1.0 - Y_PADDING), high * (1.0 + Y_PADDING))
}

/// The last `months` of `series`, counting a month as 30 days back from the
/// last bar.
pub fn history_window(series: &Series, months: u32) -> Series {
    match series.last() {
        Some(last) => series.since(last.date - Duration::days(i64::from(months) * 30)),
        None => series.clone(),
    }
}
