//! Chartscan CLI — import, batch screening jobs and per-symbol queries.
//!
//! Commands:
//! - `import` — load a CSV history into the Parquet series store
//! - `screen` — run the trend-template screen and reconcile the screened list
//! - `vcp` — run VCP detection over the screened list
//! - `levels` — support/resistance levels and chart payload for one symbol
//! - `signal` — graded breakout buy signal for one symbol
//! - `targets` — profit target and stop for the latest bar
//! - `backtest` — toy breakout backtest with optional CSV export
//! - `list screened|vcp` — print stored results
//!
//! Results print as JSON on stdout; logs go to stderr (`RUST_LOG` overrides
//! the default `info` filter).

use anyhow::{bail, Context, Result};
use chartscan_core::data::synthetic::{generate, SyntheticParams};
use chartscan_core::data::{MemorySource, ParquetStore, SeriesSource};
use chartscan_core::domain::SymbolKey;
use chartscan_core::patterns::LevelStrategy;
use chartscan_runner::{
    export_equity_csv, export_trades_csv, import_csv, run_screening, run_vcp_detection, JsonStore, QueryService,
    ScanConfig, ScreenedStore, VcpStore,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Symbols generated by `--synthetic` when a batch job needs a universe.
const SYNTHETIC_UNIVERSE: &[(&str, &str)] = &[
    ("AAPL", "usa"),
    ("MSFT", "usa"),
    ("NVDA", "usa"),
    ("KO", "usa"),
    ("INFY", "india"),
    ("TCS", "india"),
];

#[derive(Parser)]
#[command(name = "chartscan", about = "Chartscan CLI — chart-pattern screener")]
struct Cli {
    /// Path to a TOML scan config. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the Parquet series directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the result store directory.
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Read generated histories instead of the series store.
    #[arg(long, global = true, default_value_t = false)]
    synthetic: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV history (date,open,high,low,close,volume) for one symbol.
    Import {
        symbol: String,
        /// Path to the CSV file.
        csv: PathBuf,
        #[arg(long, default_value = "usa")]
        country: String,
    },
    /// Run the trend-template screen.
    Screen {
        /// Countries to screen (repeatable). Defaults to the config scope.
        #[arg(long = "country")]
        countries: Vec<String>,
    },
    /// Run VCP detection over the screened list.
    Vcp {
        #[arg(long = "country")]
        countries: Vec<String>,
        /// Detection date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
    /// Support/resistance levels and chart payload.
    Levels {
        symbol: String,
        #[arg(long, default_value = "usa")]
        country: String,
        /// Level algorithm. Defaults to the config strategy.
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
        /// Months of history to chart. Defaults to the config value.
        #[arg(long)]
        months: Option<u32>,
    },
    /// Graded breakout buy signal at the latest close.
    Signal {
        symbol: String,
        #[arg(long, default_value = "usa")]
        country: String,
    },
    /// Profit target and stop for the latest bar.
    Targets {
        symbol: String,
        #[arg(long, default_value = "usa")]
        country: String,
    },
    /// Toy breakout backtest.
    Backtest {
        symbol: String,
        #[arg(long, default_value = "usa")]
        country: String,
        /// Write the trade list as CSV.
        #[arg(long)]
        trades_csv: Option<PathBuf>,
        /// Write the equity curve as CSV.
        #[arg(long)]
        equity_csv: Option<PathBuf>,
    },
    /// Print stored results.
    List {
        #[command(subcommand)]
        table: ListTable,
    },
}

#[derive(Subcommand)]
enum ListTable {
    /// Symbols in the screened list.
    Screened {
        #[arg(long = "country")]
        countries: Vec<String>,
    },
    /// Stored VCP detections.
    Vcp {
        #[arg(long = "country")]
        countries: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Zones,
    Monotonic,
}

impl From<StrategyArg> for LevelStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Zones => LevelStrategy::pivot_zones(),
            StrategyArg::Monotonic => LevelStrategy::monotonic_runs(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chartscan=info,chartscan_core=info,chartscan_runner=info".into()),
        )
        .init();

    let Cli {
        config,
        data_dir,
        store_dir,
        synthetic,
        command,
    } = Cli::parse();
    let config = load_config(config, data_dir, store_dir)?;

    match command {
        Commands::Import { symbol, csv, country } => {
            if synthetic {
                bail!("--synthetic cannot be combined with import");
            }
            let store = ParquetStore::new(&config.data_dir);
            let key = SymbolKey::new(symbol, country);
            let rows = import_csv(&csv, &store, &key)?;
            print_json(&serde_json::json!({ "symbol": key.symbol, "country": key.country, "rows": rows }))
        }
        Commands::Screen { countries } => {
            let countries = scope(countries, &config);
            let source = open_source(synthetic, &config, None)?;
            let store = open_store(&config)?;
            let summary = run_screening(source.as_ref(), &store, &countries, &config.screener)?;
            print_json(&summary)
        }
        Commands::Vcp { countries, date } => {
            let countries = scope(countries, &config);
            let today = match date {
                Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d").with_context(|| format!("bad --date '{d}'"))?,
                None => chrono::Local::now().date_naive(),
            };
            let source = open_source(synthetic, &config, None)?;
            let store = open_store(&config)?;
            let summary = run_vcp_detection(source.as_ref(), &store, &store, &countries, &config.vcp, today)?;
            print_json(&summary)
        }
        Commands::Levels {
            symbol,
            country,
            strategy,
            months,
        } => {
            let key = SymbolKey::new(symbol, country);
            let strategy = strategy.map(LevelStrategy::from).unwrap_or(config.levels);
            let months = months.unwrap_or(config.chart_months);
            with_query(synthetic, &config, &key, |q| print_json(&q.levels(&key, months, &strategy)?))
        }
        Commands::Signal { symbol, country } => {
            let key = SymbolKey::new(symbol, country);
            with_query(synthetic, &config, &key, |q| print_json(&q.buy_signal(&key)?))
        }
        Commands::Targets { symbol, country } => {
            let key = SymbolKey::new(symbol, country);
            with_query(synthetic, &config, &key, |q| print_json(&q.targets(&key)?))
        }
        Commands::Backtest {
            symbol,
            country,
            trades_csv,
            equity_csv,
        } => {
            let key = SymbolKey::new(symbol, country);
            with_query(synthetic, &config, &key, |q| {
                let report = q.backtest(&key)?;
                if let Some(path) = &trades_csv {
                    std::fs::write(path, export_trades_csv(&report.trades)?)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), trades = report.trades.len(), "trades written");
                }
                if let Some(path) = &equity_csv {
                    std::fs::write(path, export_equity_csv(&report.equity_curve)?)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), points = report.equity_curve.len(), "equity curve written");
                }
                print_json(&report)
            })
        }
        Commands::List { table } => {
            let store = open_store(&config)?;
            match table {
                ListTable::Screened { countries } => {
                    let rows = store.list_screened(&scope(countries, &config))?;
                    print_json(&rows)
                }
                ListTable::Vcp { countries } => {
                    let rows = store.list_vcp(&scope(countries, &config))?;
                    print_json(&rows)
                }
            }
        }
    }
}

/// Config file (or defaults) with the directory overrides applied.
fn load_config(path: Option<PathBuf>, data_dir: Option<PathBuf>, store_dir: Option<PathBuf>) -> Result<ScanConfig> {
    let mut config = match path {
        Some(path) => ScanConfig::from_file(&path).with_context(|| format!("loading {}", path.display()))?,
        None => ScanConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = store_dir {
        config.store_dir = dir;
    }
    Ok(config)
}

fn scope(countries: Vec<String>, config: &ScanConfig) -> Vec<String> {
    if countries.is_empty() {
        config.countries.clone()
    } else {
        countries
    }
}

fn open_store(config: &ScanConfig) -> Result<JsonStore> {
    Ok(JsonStore::open(&config.store_dir)?)
}

/// The series source: the Parquet store, or generated histories covering
/// the demo universe plus `extra`.
fn open_source(synthetic: bool, config: &ScanConfig, extra: Option<&SymbolKey>) -> Result<Box<dyn SeriesSource>> {
    if !synthetic {
        return Ok(Box::new(ParquetStore::new(&config.data_dir)));
    }
    let end = chrono::Local::now().date_naive();
    let start = end - chrono::Duration::days(365 * 3);
    let params = SyntheticParams::default();
    let mut source = MemorySource::new();
    let universe = SYNTHETIC_UNIVERSE.iter().map(|(s, c)| SymbolKey::new(*s, *c));
    for key in universe.chain(extra.cloned()) {
        let rows = generate(&key.symbol, start, end, &params);
        source.insert(key, rows);
    }
    Ok(Box::new(source))
}

fn with_query<F>(synthetic: bool, config: &ScanConfig, key: &SymbolKey, f: F) -> Result<()>
where
    F: FnOnce(&QueryService<'_>) -> Result<()>,
{
    let source = open_source(synthetic, config, Some(key))?;
    let store = open_store(config)?;
    let query = QueryService::new(source.as_ref(), &store, &store, config);
    f(&query)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
