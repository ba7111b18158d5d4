//! Toy long-only backtest of the graded buy signal.
//!
//! One position at a time, all-in with whole shares at the close. The buy
//! signal at bar t is evaluated on the series truncated at t, so no bar sees
//! its future. Exits happen at the target or stop price once the close
//! return crosses either threshold.

use chartscan_core::domain::Series;
use chartscan_core::patterns::{evaluate_buy_signal, BuySignalParams};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::BacktestMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestParams {
    pub initial_capital: f64,
    /// Exit when the close return reaches this fraction.
    pub profit_target: f64,
    /// Exit when the close return falls to this (negative) fraction.
    pub stop_loss: f64,
    /// History window fed to the backtest, in 30-day months.
    pub months: u32,
    pub signal: BuySignalParams,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            profit_target: 0.06,
            stop_loss: -0.03,
            months: 6,
            signal: BuySignalParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub shares: u64,
    pub pl_pct: f64,
    /// Calendar days between entry and exit.
    pub holding_days: i64,
}

/// A position still held at the last bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub shares: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub trades: Vec<Trade>,
    pub open_position: Option<OpenPosition>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: BacktestMetrics,
}

pub fn run_backtest(series: &Series, params: &BacktestParams) -> BacktestReport {
    let mut cash = params.initial_capital;
    let mut position: Option<OpenPosition> = None;
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(series.len());

    for (i, bar) in series.bars().iter().enumerate() {
        let price = bar.close;
        match &position {
            None => {
                // Too little history to judge counts as no signal.
                let buy = evaluate_buy_signal(&series.truncated(i), &params.signal)
                    .map(|graded| graded.is_buy())
                    .unwrap_or(false);
                let shares = (cash / price).floor();
                if buy && shares >= 1.0 {
                    cash -= shares * price;
                    position = Some(OpenPosition {
                        entry_date: bar.date,
                        entry_price: price,
                        shares: shares as u64,
                    });
                    debug!(symbol = series.symbol(), date = %bar.date, price, shares, "entry");
                }
            }
            Some(open) => {
                let pl = (price - open.entry_price) / open.entry_price;
                let exit_return = if pl >= params.profit_target {
                    Some(params.profit_target)
                } else if pl <= params.stop_loss {
                    Some(params.stop_loss)
                } else {
                    None
                };
                if let Some(exit_return) = exit_return {
                    let exit_price = open.entry_price * (1.0 + exit_return);
                    cash += open.shares as f64 * exit_price;
                    trades.push(Trade {
                        entry_date: open.entry_date,
                        entry_price: open.entry_price,
                        exit_date: bar.date,
                        exit_price,
                        shares: open.shares,
                        pl_pct: exit_return,
                        holding_days: (bar.date - open.entry_date).num_days(),
                    });
                    debug!(symbol = series.symbol(), date = %bar.date, exit_price, "exit");
                    position = None;
                }
            }
        }

        let held = position.as_ref().map_or(0.0, |p| p.shares as f64 * price);
        equity_curve.push(EquityPoint {
            date: bar.date,
            equity: cash + held,
        });
    }

    let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
    BacktestReport {
        symbol: series.symbol().to_string(),
        metrics: BacktestMetrics::compute(&equity, &trades),
        trades,
        open_position: position,
        equity_curve,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartscan_core::domain::{Bar, SymbolKey};

    fn series(closes: &[f64]) -> Series {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
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
        Series::new(SymbolKey::new("BT", "usa"), bars).unwrap()
    }

    /// A peak at bar 10, a dip, then a rally that clears it.
    fn breakout_then(tail: &[f64]) -> Vec<f64> {
        let mut closes: Vec<f64> = (0..=10).map(|i| 100.0 + i as f64).collect();
        closes.extend((1..=10).map(|i| 110.0 - i as f64));
        closes.extend((1..=12).map(|i| 100.0 + i as f64));
        closes.extend_from_slice(tail);
        closes
    }

    #[test]
    fn short_history_never_trades() {
        let report = run_backtest(&series(&[10.0, 11.0, 12.0]), &BacktestParams::default());
        assert!(report.trades.is_empty());
        assert!(report.open_position.is_none());
        assert_eq!(report.equity_curve.len(), 3);
        assert!(report.equity_curve.iter().all(|p| p.equity == 10_000.0));
    }

    #[test]
    fn profit_target_exit() {
        let closes = breakout_then(&[112.0, 125.0]);
        let report = run_backtest(&series(&closes), &BacktestParams::default());

        let first = &report.trades[0];
        assert!(first.entry_price > 110.0);
        assert!((first.pl_pct - 0.06).abs() < 1e-12);
        assert!((first.exit_price - first.entry_price * 1.06).abs() < 1e-9);
        assert!(report.metrics.win_ratio > 0.0);
    }

    #[test]
    fn stop_loss_exit() {
        let closes = breakout_then(&[50.0]);
        let report = run_backtest(&series(&closes), &BacktestParams::default());

        let first = &report.trades[0];
        assert!((first.pl_pct + 0.03).abs() < 1e-12);
        assert_eq!(report.metrics.win_ratio, 0.0);
    }

    #[test]
    fn equity_curve_tracks_every_bar() {
        let closes = breakout_then(&[112.0, 125.0]);
        let report = run_backtest(&series(&closes), &BacktestParams::default());
        assert_eq!(report.equity_curve.len(), closes.len());
        assert_eq!(report.equity_curve[0].equity, 10_000.0);
    }
}
