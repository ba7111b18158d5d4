//! The `PatternDetector` capability shared by every detector.

use super::breakout::{evaluate_buy_signal, BuySignalParams, GradedBreakout};
use super::levels::{LevelStrategy, SupportResistance};
use super::screener::{TemplateReport, TrendTemplate};
use super::vcp::{VcpSignal, VcpStrategy};
use crate::domain::Series;
use crate::error::DetectError;

/// A detector selectable by callers.
///
/// # Architecture invariant
/// Detectors see only the prepared series and their own parameters. They
/// never touch a source, a result store or shared state, so the batch jobs
/// can run them on any thread.
pub trait PatternDetector: Send + Sync {
    type Output;

    /// Stable name used in logs and error messages.
    fn name(&self) -> &str;

    /// Fewest bars the detector can judge.
    fn min_bars(&self) -> usize;

    fn detect(&self, series: &Series) -> Result<Self::Output, DetectError>;
}

impl PatternDetector for TrendTemplate {
    type Output = TemplateReport;

    fn name(&self) -> &str {
        "trend_template"
    }

    fn min_bars(&self) -> usize {
        self.min_bars
    }

    fn detect(&self, series: &Series) -> Result<TemplateReport, DetectError> {
        self.evaluate(series)
    }
}

impl PatternDetector for VcpStrategy {
    type Output = Option<VcpSignal>;

    fn name(&self) -> &str {
        VcpStrategy::name(self)
    }

    fn min_bars(&self) -> usize {
        VcpStrategy::min_bars(self)
    }

    fn detect(&self, series: &Series) -> Result<Option<VcpSignal>, DetectError> {
        self.analyze(series)
    }
}

impl PatternDetector for LevelStrategy {
    type Output = SupportResistance;

    fn name(&self) -> &str {
        LevelStrategy::name(self)
    }

    fn min_bars(&self) -> usize {
        LevelStrategy::min_bars(self)
    }

    /// Never fails; a series too short for the window has no levels.
    fn detect(&self, series: &Series) -> Result<SupportResistance, DetectError> {
        Ok(self.levels(series))
    }
}

impl PatternDetector for BuySignalParams {
    type Output = GradedBreakout;

    fn name(&self) -> &str {
        "buy_signal"
    }

    fn min_bars(&self) -> usize {
        self.window.span()
    }

    fn detect(&self, series: &Series) -> Result<GradedBreakout, DetectError> {
        evaluate_buy_signal(series, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, SymbolKey};
    use chrono::NaiveDate;

    fn short_series(n: usize) -> Series {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..n)
            .map(|i| Bar {
                date: base + chrono::Duration::days(i as i64),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0,
                volume: 1,
            })
            .collect();
        Series::new(SymbolKey::new("S", "usa"), bars).unwrap()
    }

    fn insufficient<D: PatternDetector>(detector: &D) -> bool {
        let series = short_series(detector.min_bars() - 1);
        matches!(detector.detect(&series), Err(e) if e.is_insufficient_data())
    }

    #[test]
    fn detectors_report_insufficient_data_below_min_bars() {
        assert!(insufficient(&TrendTemplate::default()));
        assert!(insufficient(&VcpStrategy::default()));
        assert!(insufficient(&BuySignalParams::default()));
    }

    #[test]
    fn level_strategies_never_fail() {
        let strategy = LevelStrategy::pivot_zones();
        let result = strategy.detect(&short_series(3)).unwrap();
        assert!(result.resistance.is_empty());
    }

    #[test]
    fn names_are_distinct() {
        let template = TrendTemplate::default();
        let vcp = VcpStrategy::default();
        let levels = LevelStrategy::monotonic_runs();
        let buy = BuySignalParams::default();
        let names = [
            PatternDetector::name(&template),
            PatternDetector::name(&vcp),
            PatternDetector::name(&levels),
            PatternDetector::name(&buy),
        ];
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }
}
