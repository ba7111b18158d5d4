//! Indicators: pure functions from bar history to a numeric series.
//!
//! Every indicator returns a series the same length as its input whose first
//! `lookback()` values are `f64::NAN` (warmup). No value at bar t depends on
//! bars after t.

pub mod atr;
pub mod sma;

pub use atr::{true_range, MeanAtr};
pub use sma::Sma;

use crate::domain::Bar;

/// Trait for indicators.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_50", "mean_atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;

    /// Value at the last bar, or `None` during warmup.
    fn latest(&self, bars: &[Bar]) -> Option<f64> {
        self.compute(bars).last().copied().filter(|v| !v.is_nan())
    }
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
