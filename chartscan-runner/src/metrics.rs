//! Backtest metrics — pure functions of the equity curve and trade list.

use serde::{Deserialize, Serialize};

use crate::backtest::Trade;

/// Summary statistics of one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub total_return: f64,
    pub sharpe: f64,
    /// Mean P/L fraction per closed trade.
    pub average_pl: f64,
    pub win_ratio: f64,
    pub trade_count: usize,
}

impl BacktestMetrics {
    pub fn compute(equity_curve: &[f64], trades: &[Trade]) -> Self {
        Self {
            total_return: total_return(equity_curve),
            sharpe: sharpe_ratio(equity_curve),
            average_pl: average_pl(trades),
            win_ratio: win_ratio(trades),
            trade_count: trades.len(),
        }
    }
}

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&final_eq)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (final_eq - initial) / initial
        }
        _ => 0.0,
    }
}

/// Annualized Sharpe ratio from daily returns, zero risk-free rate.
///
/// Sharpe = mean(daily returns) / std(daily returns) * sqrt(252).
/// Returns 0.0 if variance is zero or fewer than 2 returns.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean_f64(&returns) / std) * (252.0_f64).sqrt()
}

pub fn average_pl(trades: &[Trade]) -> f64 {
    let pls: Vec<f64> = trades.iter().map(|t| t.pl_pct).collect();
    mean_f64(&pls)
}

/// Fraction of trades with a positive P/L.
pub fn win_ratio(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.pl_pct > 0.0).count();
    winners as f64 / trades.len() as f64
}

pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1).
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trade(pl_pct: f64) -> Trade {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        Trade {
            entry_date: d,
            entry_price: 100.0,
            exit_date: d,
            exit_price: 100.0 * (1.0 + pl_pct),
            shares: 10,
            pl_pct,
            holding_days: 0,
        }
    }

    #[test]
    fn total_return_basic() {
        assert!((total_return(&[100.0, 110.0]) - 0.1).abs() < 1e-10);
        assert_eq!(total_return(&[100.0]), 0.0);
        assert_eq!(total_return(&[]), 0.0);
    }

    #[test]
    fn sharpe_constant_equity_is_zero() {
        assert_eq!(sharpe_ratio(&vec![10_000.0; 100]), 0.0);
    }

    #[test]
    fn sharpe_known_returns() {
        let mut eq = vec![10_000.0];
        for i in 1..253 {
            let r = if i % 2 == 0 { 1.002 } else { 1.0005 };
            eq.push(eq[i - 1] * r);
        }
        let s = sharpe_ratio(&eq);
        assert!(s > 5.0, "consistently positive returns should give a high Sharpe, got {s}");
    }

    #[test]
    fn trade_statistics() {
        let trades = vec![trade(0.06), trade(-0.03), trade(0.06)];
        assert!((average_pl(&trades) - 0.03).abs() < 1e-12);
        assert!((win_ratio(&trades) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(win_ratio(&[]), 0.0);
        assert_eq!(average_pl(&[]), 0.0);
    }

    #[test]
    fn std_dev_is_sample() {
        assert!((std_dev(&[1.0, 2.0, 3.0, 4.0]) - 1.2909944487358056).abs() < 1e-12);
    }
}
