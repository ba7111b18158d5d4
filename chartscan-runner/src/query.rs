//! Read-side query surface: stored results, chart payloads and on-demand
//! signals for one symbol.

use chartscan_core::chart::{history_window, ChartPayload};
use chartscan_core::data::SeriesSource;
use chartscan_core::domain::{Series, SymbolKey};
use chartscan_core::patterns::{
    breakout_targets, build_trend_line, evaluate_buy_signal, BreakoutTargets, GradedBreakout, LevelStrategy,
    PivotSide, SupportResistance,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::backtest::{run_backtest, BacktestReport};
use crate::config::ScanConfig;
use crate::pipeline::{load_series, RunError};
use crate::store::{ScreenedRow, ScreenedStore, VcpRow, VcpStore};

/// Support/resistance result for a symbol, with its chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelsView {
    pub key: SymbolKey,
    pub strategy: String,
    pub levels: SupportResistance,
    pub chart: ChartPayload,
}

/// Target/stop evaluation of a symbol's last bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetsView {
    pub key: SymbolKey,
    pub date: Option<NaiveDate>,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub resistance: Vec<f64>,
    pub targets: Option<BreakoutTargets>,
}

pub struct QueryService<'a> {
    source: &'a dyn SeriesSource,
    screened: &'a dyn ScreenedStore,
    vcp: &'a dyn VcpStore,
    config: &'a ScanConfig,
}

impl<'a> QueryService<'a> {
    pub fn new(
        source: &'a dyn SeriesSource,
        screened: &'a dyn ScreenedStore,
        vcp: &'a dyn VcpStore,
        config: &'a ScanConfig,
    ) -> Self {
        Self {
            source,
            screened,
            vcp,
            config,
        }
    }

    pub fn list_screened(&self, countries: &[String]) -> Result<Vec<ScreenedRow>, RunError> {
        Ok(self.screened.list_screened(countries)?)
    }

    pub fn list_vcp(&self, countries: &[String]) -> Result<Vec<VcpRow>, RunError> {
        Ok(self.vcp.list_vcp(countries)?)
    }

    /// The last `months` of the symbol's prepared history.
    fn recent(&self, key: &SymbolKey, months: u32) -> Result<Series, RunError> {
        let series = load_series(self.source, key, None)?;
        Ok(history_window(&series, months))
    }

    /// Levels and chart over the last `months`. The HIGH trend line is drawn
    /// when the strategy found two high pivots.
    pub fn levels(&self, key: &SymbolKey, months: u32, strategy: &LevelStrategy) -> Result<LevelsView, RunError> {
        let series = self.recent(key, months)?;
        let levels = strategy.levels(&series);
        let trend_line = build_trend_line(&levels.pivots, PivotSide::High)?;
        let title = format!("{} support and resistance ({})", key, strategy.name());
        let chart = ChartPayload::build(title, &series, &levels, trend_line.as_ref());
        Ok(LevelsView {
            key: key.clone(),
            strategy: strategy.name().to_string(),
            levels,
            chart,
        })
    }

    /// Graded buy signal at the latest close.
    pub fn buy_signal(&self, key: &SymbolKey) -> Result<GradedBreakout, RunError> {
        let series = self.recent(key, self.config.signal_months)?;
        Ok(evaluate_buy_signal(&series, &self.config.buy_signal)?)
    }

    /// Target/stop of the last bar against the configured level strategy's
    /// resistance.
    pub fn targets(&self, key: &SymbolKey) -> Result<TargetsView, RunError> {
        let series = self.recent(key, self.config.signal_months)?;
        let resistance = self.config.levels.levels(&series).resistance_prices();
        let last = series.last().copied();
        let targets = last.and_then(|bar| breakout_targets(bar.open, bar.close, &resistance, &self.config.targets));
        Ok(TargetsView {
            key: key.clone(),
            date: last.map(|b| b.date),
            open: last.map(|b| b.open),
            close: last.map(|b| b.close),
            resistance,
            targets,
        })
    }

    pub fn backtest(&self, key: &SymbolKey) -> Result<BacktestReport, RunError> {
        let series = self.recent(key, self.config.backtest.months)?;
        Ok(run_backtest(&series, &self.config.backtest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chartscan_core::data::synthetic::{generate, SyntheticParams};
    use chartscan_core::data::MemorySource;
    use chartscan_core::patterns::VcpStage;

    fn fixture() -> (MemorySource, MemoryStore, SymbolKey) {
        let key = SymbolKey::new("QRY", "usa");
        let mut source = MemorySource::new();
        source.insert(
            key.clone(),
            generate(
                "QRY",
                NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 12, 29).unwrap(),
                &SyntheticParams::default(),
            ),
        );
        let store = MemoryStore::new();
        (source, store, key)
    }

    #[test]
    fn lists_are_scoped() {
        let (source, store, key) = fixture();
        let config = ScanConfig::default();
        store.upsert_screened(&key).unwrap();
        store
            .upsert_vcp(&key, VcpStage::Early, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .unwrap();
        let service = QueryService::new(&source, &store, &store, &config);

        assert_eq!(service.list_screened(&["usa".into()]).unwrap().len(), 1);
        assert!(service.list_screened(&["india".into()]).unwrap().is_empty());
        assert_eq!(service.list_vcp(&[]).unwrap()[0].stage, VcpStage::Early);
    }

    #[test]
    fn levels_in_both_strategies() {
        let (source, store, key) = fixture();
        let config = ScanConfig::default();
        let service = QueryService::new(&source, &store, &store, &config);

        for strategy in [LevelStrategy::pivot_zones(), LevelStrategy::monotonic_runs()] {
            let view = service.levels(&key, 6, &strategy).unwrap();
            assert_eq!(view.strategy, strategy.name());
            let first = view.chart.candles.first().unwrap().date;
            let last = view.chart.candles.last().unwrap().date;
            assert!((last - first).num_days() <= 180);
            assert!(view.chart.markers.len() <= view.levels.pivots.len());
        }
    }

    #[test]
    fn signal_targets_and_backtest_run() {
        let (source, store, key) = fixture();
        let config = ScanConfig::default();
        let service = QueryService::new(&source, &store, &store, &config);

        service.buy_signal(&key).unwrap();
        let targets = service.targets(&key).unwrap();
        assert!(targets.close.is_some());
        if let Some(t) = targets.targets {
            assert!(t.profit_target >= targets.close.unwrap());
        }
        let report = service.backtest(&key).unwrap();
        assert!(!report.equity_curve.is_empty());
    }

    #[test]
    fn unknown_symbol_is_a_source_error() {
        let (source, store, _) = fixture();
        let config = ScanConfig::default();
        let service = QueryService::new(&source, &store, &store, &config);
        let err = service.buy_signal(&SymbolKey::new("NOPE", "usa")).unwrap_err();
        assert!(matches!(err, RunError::Source(_)));
    }
}
