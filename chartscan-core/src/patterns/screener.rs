//! Moving-average trend template.
//!
//! A symbol qualifies when price sits above its 50/150/200-bar SMAs, the
//! averages are stacked in ascending order, and price is well off its
//! 52-week low and near its 52-week high.

use serde::{Deserialize, Serialize};

use crate::domain::Series;
use crate::error::DetectError;
use crate::indicators::{Indicator, Sma};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendTemplate {
    pub min_bars: usize,
    pub fast: usize,
    pub mid: usize,
    pub slow: usize,
    /// Bars in the 52-week window.
    pub year_bars: usize,
    /// Close must be at least this multiple of the 52-week low.
    pub min_above_low: f64,
    /// Close must be at least this fraction of the 52-week high.
    pub min_of_high: f64,
}

impl Default for TrendTemplate {
    fn default() -> Self {
        Self {
            min_bars: 50,
            fast: 50,
            mid: 150,
            slow: 200,
            year_bars: 252,
            min_above_low: 1.30,
            min_of_high: 0.75,
        }
    }
}

/// Outcome of each criterion. A missing average fails every criterion it
/// takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateCriteria {
    pub above_averages: bool,
    pub fast_above_mid: bool,
    pub mid_above_slow: bool,
    pub above_year_low: bool,
    pub near_year_high: bool,
}

impl TemplateCriteria {
    pub fn as_array(&self) -> [bool; 5] {
        [
            self.above_averages,
            self.fast_above_mid,
            self.mid_above_slow,
            self.above_year_low,
            self.near_year_high,
        ]
    }

    pub fn all(&self) -> bool {
        self.as_array().iter().all(|&c| c)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateReport {
    pub close: f64,
    pub sma_fast: Option<f64>,
    pub sma_mid: Option<f64>,
    pub sma_slow: Option<f64>,
    pub year_high: f64,
    pub year_low: f64,
    pub criteria: TemplateCriteria,
    pub qualifies: bool,
}

impl TrendTemplate {
    /// Evaluate the template at the last bar.
    ///
    /// Fails with `InsufficientData` below `min_bars`; between that and the
    /// slow period the report is produced but cannot qualify.
    pub fn evaluate(&self, series: &Series) -> Result<TemplateReport, DetectError> {
        series.require("trend_template", self.min_bars.max(1))?;
        let bars = series.bars();
        let close = match series.last() {
            Some(bar) => bar.close,
            None => return Err(DetectError::insufficient("trend_template", 1, 0)),
        };

        let sma_fast = Sma::new(self.fast).latest(bars);
        let sma_mid = Sma::new(self.mid).latest(bars);
        let sma_slow = Sma::new(self.slow).latest(bars);

        let year = &bars[bars.len().saturating_sub(self.year_bars)..];
        let year_high = year.iter().map(|b| b.close).fold(f64::NEG_INFINITY, f64::max);
        let year_low = year.iter().map(|b| b.close).fold(f64::INFINITY, f64::min);

        let criteria = match (sma_fast, sma_mid, sma_slow) {
            (Some(fast), Some(mid), Some(slow)) => TemplateCriteria {
                above_averages: close >= fast && close >= mid && close >= slow,
                fast_above_mid: fast >= mid,
                mid_above_slow: mid >= slow,
                above_year_low: close >= self.min_above_low * year_low,
                near_year_high: close >= self.min_of_high * year_high,
            },
            _ => TemplateCriteria {
                above_year_low: close >= self.min_above_low * year_low,
                near_year_high: close >= self.min_of_high * year_high,
                ..TemplateCriteria::default()
            },
        };

        Ok(TemplateReport {
            close,
            sma_fast,
            sma_mid,
            sma_slow,
            year_high,
            year_low,
            criteria,
            qualifies: criteria.all(),
        })
    }
}
