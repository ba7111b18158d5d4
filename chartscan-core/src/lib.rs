//! Chartscan Core — series preparation and chart-pattern detectors.
//!
//! This crate contains the pure detection engine:
//! - Domain types (bars, series, symbol keys)
//! - Series preparation (dedupe, null removal, ordering) and data sources
//! - Indicators (SMA, true range, mean ATR)
//! - Pivot extraction, support/resistance levels, trend lines
//! - Breakout grading and target/stop computation
//! - Trend-template screen and both VCP strategies
//! - Declarative chart payloads for the query surface
//!
//! Every detector is a pure function of a prepared [`domain::Series`] and its
//! parameters. Nothing here mutates shared state or touches a result store.

pub mod chart;
pub mod data;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod patterns;

pub use error::DetectError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: detector inputs and outputs can cross rayon workers.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Series>();
        require_sync::<domain::Series>();
        require_send::<domain::SymbolKey>();
        require_sync::<domain::SymbolKey>();

        require_send::<patterns::Pivot>();
        require_sync::<patterns::Pivot>();
        require_send::<patterns::SupportResistance>();
        require_sync::<patterns::SupportResistance>();
        require_send::<patterns::TrendLine>();
        require_sync::<patterns::TrendLine>();
        require_send::<patterns::GradedBreakout>();
        require_sync::<patterns::GradedBreakout>();
        require_send::<patterns::TemplateReport>();
        require_sync::<patterns::TemplateReport>();
        require_send::<patterns::VcpSignal>();
        require_sync::<patterns::VcpSignal>();
        require_send::<patterns::VcpStrategy>();
        require_sync::<patterns::VcpStrategy>();
        require_send::<patterns::LevelStrategy>();
        require_sync::<patterns::LevelStrategy>();

        require_send::<chart::ChartPayload>();
        require_sync::<chart::ChartPayload>();
        require_send::<DetectError>();
        require_sync::<DetectError>();
    }

    /// Architecture contract: detectors see a series and their own params only.
    #[test]
    fn pattern_detector_takes_only_a_series() {
        fn _check<D: patterns::PatternDetector>(
            detector: &D,
            series: &domain::Series,
        ) -> Result<D::Output, DetectError> {
            detector.detect(series)
        }
    }
}
