//! CSV export of backtest artifacts: trade tape and equity curve.

use thiserror::Error;

use crate::backtest::{EquityPoint, Trade};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv buffer: {0}")]
    Flush(String),
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| ExportError::Flush(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Flush(e.to_string()))
}

/// Columns: entry_date, entry_price, exit_date, exit_price, shares, pl_pct,
/// holding_days
pub fn export_trades_csv(trades: &[Trade]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "shares",
        "pl_pct",
        "holding_days",
    ])?;
    for t in trades {
        wtr.write_record([
            &t.entry_date.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_date.to_string(),
            &format!("{:.6}", t.exit_price),
            &t.shares.to_string(),
            &format!("{:.6}", t.pl_pct),
            &t.holding_days.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Columns: date, equity
pub fn export_equity_csv(points: &[EquityPoint]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity"])?;
    for p in points {
        wtr.write_record([p.date.to_string(), format!("{:.2}", p.equity)])?;
    }
    finish(wtr)
}
