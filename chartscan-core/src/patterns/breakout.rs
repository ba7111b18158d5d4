//! Breakout grading and target/stop computation.

use serde::{Deserialize, Serialize};

use super::pivot::{find_pivots, PivotKind, PivotWindow};
use super::trendline::{build_trend_line, PivotSide};
use crate::domain::Series;
use crate::error::DetectError;

/// Confidence grade of a breakout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Probability {
    None,
    Low,
    Medium,
    High,
}

/// Graded-probability breakout at one price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedBreakout {
    pub price: f64,
    pub probability: Probability,
    pub breaks_resistance: bool,
    pub breaks_trendline: bool,
    pub convergence: bool,
    /// Nearest resistance below the price: the highest level it clears.
    pub broken_level: Option<f64>,
    pub trendline_price: Option<f64>,
}

impl GradedBreakout {
    pub fn is_buy(&self) -> bool {
        self.probability != Probability::None
    }
}

/// Grade `price` against resistance prices and an optional trend-line
/// projection. Convergence means the broken level and the projection agree
/// within `convergence_tolerance` of the level.
pub fn grade_breakout(
    price: f64,
    resistance: &[f64],
    trendline_price: Option<f64>,
    convergence_tolerance: f64,
) -> GradedBreakout {
    let broken_level = resistance
        .iter()
        .copied()
        .filter(|level| level.is_finite() && price > *level)
        .max_by(f64::total_cmp);
    let breaks_resistance = broken_level.is_some();
    let breaks_trendline = trendline_price.is_some_and(|tl| price > tl);
    let convergence = match (broken_level, trendline_price) {
        (Some(level), Some(tl)) if level != 0.0 => (tl - level).abs() / level < convergence_tolerance,
        _ => false,
    };

    let probability = match (breaks_resistance, breaks_trendline) {
        (true, true) if convergence => Probability::High,
        (true, true) => Probability::Medium,
        (true, false) | (false, true) => Probability::Low,
        (false, false) => Probability::None,
    };

    GradedBreakout {
        price,
        probability,
        breaks_resistance,
        breaks_trendline,
        convergence,
        broken_level,
        trendline_price,
    }
}

/// Parameters of end-to-end buy-signal evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuySignalParams {
    pub window: PivotWindow,
    pub convergence_tolerance: f64,
}

impl Default for BuySignalParams {
    fn default() -> Self {
        Self {
            window: PivotWindow::WIDE,
            convergence_tolerance: 0.01,
        }
    }
}

/// Grade the latest close of `series`.
///
/// Resistance is every HIGH pivot's high; the trend line runs through the two
/// most recent HIGH pivots and is projected to the last bar's date.
pub fn evaluate_buy_signal(series: &Series, params: &BuySignalParams) -> Result<GradedBreakout, DetectError> {
    series.require("buy_signal", params.window.span())?;
    let last = match series.last() {
        Some(bar) => *bar,
        None => return Err(DetectError::insufficient("buy_signal", params.window.span(), 0)),
    };

    let pivots = find_pivots(series, params.window);
    let resistance: Vec<f64> = pivots
        .iter()
        .filter(|p| p.kind == PivotKind::High)
        .map(|p| p.high)
        .collect();
    let trendline_price = build_trend_line(&pivots, PivotSide::High)?.map(|line| line.price_at(last.date));

    Ok(grade_breakout(last.close, &resistance, trendline_price, params.convergence_tolerance))
}

/// Constants of target/stop mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetParams {
    /// A target level must sit at least this multiple above the breakout level.
    pub breakout_threshold: f64,
    /// Target multiple of the close when no level qualifies.
    pub fallback_target: f64,
    pub max_stop_loss: f64,
}

impl Default for TargetParams {
    fn default() -> Self {
        Self {
            breakout_threshold: 1.06,
            fallback_target: 1.10,
            max_stop_loss: 0.08,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakoutTargets {
    pub breakout_level: f64,
    pub profit_target: f64,
    pub profit_percentage: f64,
    pub stop_loss_percentage: f64,
    pub stop_price: f64,
}

/// Target and stop for a bar that crossed resistance intrabar.
///
/// A level counts as broken only when `open < level < close`. Returns `None`
/// when nothing was broken.
pub fn breakout_targets(
    open: f64,
    close: f64,
    resistance: &[f64],
    params: &TargetParams,
) -> Option<BreakoutTargets> {
    if !close.is_finite() || close <= 0.0 {
        return None;
    }
    let breakout_level = resistance
        .iter()
        .copied()
        .filter(|level| open < *level && *level < close)
        .max_by(f64::total_cmp)?;

    let profit_target = resistance
        .iter()
        .copied()
        .filter(|level| *level >= breakout_level * params.breakout_threshold)
        .min_by(f64::total_cmp)
        .unwrap_or(close * params.fallback_target);
    let profit_percentage = (profit_target - close) / close;
    let stop_loss_percentage = (profit_percentage / 2.0).min(params.max_stop_loss);

    Some(BreakoutTargets {
        breakout_level,
        profit_target,
        profit_percentage,
        stop_loss_percentage,
        stop_price: close * (1.0 - stop_loss_percentage),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, SymbolKey};
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    #[test]
    fn grades() {
        let high = grade_breakout(105.0, &[100.0], Some(100.5), 0.01);
        assert_eq!(high.probability, Probability::High);
        assert!(high.is_buy());

        let medium = grade_breakout(105.0, &[100.0], Some(95.0), 0.01);
        assert_eq!(medium.probability, Probability::Medium);

        let resistance_only = grade_breakout(105.0, &[100.0], Some(110.0), 0.01);
        assert_eq!(resistance_only.probability, Probability::Low);

        let trendline_only = grade_breakout(105.0, &[120.0], Some(100.0), 0.01);
        assert_eq!(trendline_only.probability, Probability::Low);

        let nothing = grade_breakout(105.0, &[120.0], None, 0.01);
        assert_eq!(nothing.probability, Probability::None);
        assert!(!nothing.is_buy());
    }

    #[test]
    fn nearest_broken_level_is_highest_below_price() {
        let graded = grade_breakout(105.0, &[90.0, 120.0, 101.0, 95.0], None, 0.01);
        assert_eq!(graded.broken_level, Some(101.0));
    }

    #[test]
    fn convergence_is_judged_against_the_nearest_level() {
        // 90 would not converge with 101.5, 101 does.
        let graded = grade_breakout(105.0, &[90.0, 101.0], Some(101.5), 0.01);
        assert!(graded.convergence);
        assert_eq!(graded.probability, Probability::High);
    }

    #[test]
    fn targets_reference_case() {
        let targets = breakout_targets(90.0, 110.0, &[100.0, 120.0], &TargetParams::default()).unwrap();
        assert_approx(targets.breakout_level, 100.0, DEFAULT_EPSILON);
        assert_approx(targets.profit_target, 120.0, DEFAULT_EPSILON);
        assert_approx(targets.profit_percentage, 10.0 / 110.0, 1e-12);
        assert_approx(targets.stop_loss_percentage, 5.0 / 110.0, 1e-12);
        assert_approx(targets.stop_price, 105.0, 1e-9);
    }

    #[test]
    fn fallback_target_and_stop_cap() {
        let targets = breakout_targets(90.0, 110.0, &[100.0, 104.0], &TargetParams::default()).unwrap();
        assert_approx(targets.breakout_level, 104.0, DEFAULT_EPSILON);
        assert_approx(targets.profit_target, 121.0, 1e-9);
        // 10% / 2 = 5% stays under the 8% cap.
        assert_approx(targets.stop_loss_percentage, 0.05, 1e-9);

        let far = breakout_targets(90.0, 110.0, &[100.0, 200.0], &TargetParams::default()).unwrap();
        assert_approx(far.stop_loss_percentage, 0.08, DEFAULT_EPSILON);
    }

    #[test]
    fn close_above_without_intrabar_cross_is_no_signal() {
        // Gap up: the level is below the open, so it was not crossed intrabar.
        assert!(breakout_targets(101.0, 110.0, &[100.0], &TargetParams::default()).is_none());
        assert!(breakout_targets(90.0, 95.0, &[100.0], &TargetParams::default()).is_none());
        assert!(breakout_targets(90.0, 110.0, &[], &TargetParams::default()).is_none());
    }

    fn series_with_peaks() -> Series {
        // Two swing peaks (falling) followed by a rally through both.
        let mut closes = Vec::new();
        closes.extend((0..12).map(|i| 100.0 + i as f64));
        closes.extend((0..12).map(|i| 110.0 - i as f64));
        closes.extend((0..12).map(|i| 100.0 + 0.8 * i as f64));
        closes.extend((0..12).map(|i| 108.0 - i as f64));
        closes.extend((0..12).map(|i| 98.0 + 1.5 * i as f64));
        let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                date: base + chrono::Duration::days(i as i64),
                open: c,
                high: c + 0.5,
                low: c - 0.5,
                close: c,
                volume: 1_000,
            })
            .collect();
        Series::new(SymbolKey::new("BRK", "usa"), bars).unwrap()
    }

    #[test]
    fn evaluate_buy_signal_on_rally() {
        let series = series_with_peaks();
        let graded = evaluate_buy_signal(&series, &BuySignalParams::default()).unwrap();
        assert!(graded.breaks_resistance);
        assert!(graded.breaks_trendline);
        assert!(!graded.convergence);
        assert_eq!(graded.probability, Probability::Medium);
        assert_eq!(graded.broken_level, Some(111.5));
    }

    #[test]
    fn evaluate_buy_signal_needs_full_window() {
        let series = series_with_peaks().truncated(10);
        let err = evaluate_buy_signal(&series, &BuySignalParams::default()).unwrap_err();
        assert!(err.is_insufficient_data());
    }
}
