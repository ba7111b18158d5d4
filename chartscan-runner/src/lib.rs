//! Chartscan Runner — reconciliation jobs, result stores and the query surface.
//!
//! This crate builds on `chartscan-core` to provide:
//! - TOML scan configuration with validation
//! - Screened-list and VCP result stores (in-memory and JSON-file backed)
//! - Parallel reconciliation jobs with fingerprinted run summaries
//! - CSV import into the Parquet series store
//! - Read-side queries: levels charts, buy signals, targets, toy backtests
//! - Backtest metrics and CSV export

pub mod backtest;
pub mod config;
pub mod export;
pub mod import;
pub mod metrics;
pub mod pipeline;
pub mod query;
pub mod screen;
pub mod store;
pub mod summary;
pub mod vcp;

pub use backtest::{run_backtest, BacktestParams, BacktestReport, EquityPoint, OpenPosition, Trade};
pub use config::{ConfigError, RunId, ScanConfig};
pub use export::{export_equity_csv, export_trades_csv, ExportError};
pub use import::{import_csv, read_csv, ImportError};
pub use metrics::BacktestMetrics;
pub use pipeline::{load_series, scan, Outcome, RunError};
pub use query::{LevelsView, QueryService, TargetsView};
pub use screen::run_screening;
pub use store::{JsonStore, MemoryStore, ScreenedRow, ScreenedStore, StoreError, Upsert, VcpRow, VcpStore};
pub use summary::{fingerprint, RunSummary};
pub use vcp::run_vcp_detection;
