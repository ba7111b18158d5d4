//! Scan configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use chartscan_core::patterns::{BuySignalParams, LevelStrategy, TargetParams, TrendTemplate, VcpStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backtest::BacktestParams;

/// Content-addressable identifier of a batch run.
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Country scope of batch runs. Empty means every country in the source.
    pub countries: Vec<String>,
    /// Root of the Parquet series store.
    pub data_dir: PathBuf,
    /// Directory of the JSON result stores.
    pub store_dir: PathBuf,
    /// History window of chart payloads, in 30-day months.
    pub chart_months: u32,
    /// History window of buy-signal and target evaluation.
    pub signal_months: u32,
    pub screener: TrendTemplate,
    pub vcp: VcpStrategy,
    pub levels: LevelStrategy,
    pub buy_signal: BuySignalParams,
    pub targets: TargetParams,
    pub backtest: BacktestParams,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            countries: Vec::new(),
            data_dir: PathBuf::from("data/series"),
            store_dir: PathBuf::from("data/results"),
            chart_months: 6,
            signal_months: 60,
            screener: TrendTemplate::default(),
            vcp: VcpStrategy::default(),
            levels: LevelStrategy::default(),
            buy_signal: BuySignalParams::default(),
            targets: TargetParams::default(),
            backtest: BacktestParams::default(),
        }
    }
}

impl ScanConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no detector can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        let t = &self.screener;
        if t.fast == 0 || t.mid == 0 || t.slow == 0 || t.year_bars == 0 {
            return invalid("screener periods must be positive");
        }
        if t.min_above_low < 0.0 || t.min_of_high < 0.0 {
            return invalid("screener thresholds must be non-negative");
        }

        match &self.vcp {
            VcpStrategy::Swing(p) => {
                if p.min_contractions == 0 {
                    return invalid("vcp.min_contractions must be positive");
                }
                if p.min_depth < 0.0 || p.depth_tolerance < 0.0 || p.volume_tolerance < 0.0 {
                    return invalid("vcp fractions must be non-negative");
                }
            }
            VcpStrategy::AtrRatio(p) => {
                if p.lookback == 0 || p.fast_sma == 0 || p.slow_sma == 0 {
                    return invalid("vcp windows must be positive");
                }
                if p.contraction_threshold < 0.0 {
                    return invalid("vcp.contraction_threshold must be non-negative");
                }
            }
        }

        match &self.levels {
            LevelStrategy::PivotZones { window, clustering } => {
                if window.before == 0 && window.after == 0 {
                    return invalid("levels.window must compare at least one neighbour");
                }
                if clustering.max_gap < 0.0 || clustering.max_zone_width < 0.0 {
                    return invalid("levels clustering fractions must be non-negative");
                }
            }
            LevelStrategy::MonotonicRuns { before, after, min_separation } => {
                if *before == 0 && *after == 0 {
                    return invalid("levels run lengths must not both be zero");
                }
                if *min_separation < 0.0 {
                    return invalid("levels.min_separation must be non-negative");
                }
            }
        }

        if self.buy_signal.convergence_tolerance < 0.0 {
            return invalid("buy_signal.convergence_tolerance must be non-negative");
        }
        if self.targets.breakout_threshold < 1.0 || self.targets.fallback_target < 1.0 {
            return invalid("target multiples must be at least 1.0");
        }
        if !(0.0..1.0).contains(&self.targets.max_stop_loss) {
            return invalid("targets.max_stop_loss must be in [0, 1)");
        }

        let b = &self.backtest;
        if b.initial_capital <= 0.0 {
            return invalid("backtest.initial_capital must be positive");
        }
        if b.profit_target <= 0.0 || b.stop_loss >= 0.0 {
            return invalid("backtest needs a positive profit_target and a negative stop_loss");
        }

        if self.chart_months == 0 || self.signal_months == 0 {
            return invalid("history windows must be at least one month");
        }
        Ok(())
    }
}
