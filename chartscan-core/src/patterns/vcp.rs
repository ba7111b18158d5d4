//! Volatility contraction pattern (VCP).
//!
//! Two strategies:
//! - **Swing contraction**: successive high→low swings must each retrace at
//!   least a minimum depth, shrink step to step and come on falling volume.
//! - **ATR ratio**: mean true range over the latest window must have dropped
//!   enough against the window before it, in a stage 2 uptrend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Series};
use crate::error::DetectError;
use crate::indicators::{mean, Indicator, MeanAtr, Sma};

/// Maturity or trend stage of a detected pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VcpStage {
    #[serde(rename = "EARLY")]
    Early,
    #[serde(rename = "MATURE")]
    Mature,
    #[serde(rename = "Stage 2")]
    Stage2,
    /// Reserved for decaying patterns; no strategy emits it.
    #[serde(rename = "Stage 4")]
    Stage4,
}

impl VcpStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            VcpStage::Early => "EARLY",
            VcpStage::Mature => "MATURE",
            VcpStage::Stage2 => "Stage 2",
            VcpStage::Stage4 => "Stage 4",
        }
    }
}

impl std::fmt::Display for VcpStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One high→low swing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contraction {
    pub high_date: NaiveDate,
    pub high: f64,
    pub low_date: NaiveDate,
    pub low: f64,
    /// `(high - low) / high`.
    pub depth: f64,
    /// Mean volume over the swing, both ends included.
    pub mean_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VcpEvidence {
    Swings {
        contractions: Vec<Contraction>,
    },
    AtrRatio {
        recent_atr: f64,
        prior_atr: f64,
        contraction: f64,
        sma_fast: f64,
        sma_slow: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcpSignal {
    pub stage: VcpStage,
    /// Date of the last bar analysed.
    pub detected_date: NaiveDate,
    pub evidence: VcpEvidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingParams {
    pub min_bars: usize,
    pub min_contractions: usize,
    pub min_depth: f64,
    /// A contraction may exceed the previous one by at most this much depth.
    pub depth_tolerance: f64,
    /// Swing volume may exceed the previous swing's by at most this fraction.
    pub volume_tolerance: f64,
    pub mature_contractions: usize,
}

impl Default for SwingParams {
    fn default() -> Self {
        Self {
            min_bars: 100,
            min_contractions: 2,
            min_depth: 0.10,
            depth_tolerance: 0.05,
            volume_tolerance: 0.05,
            mature_contractions: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtrParams {
    pub lookback: usize,
    pub contraction_threshold: f64,
    pub fast_sma: usize,
    pub slow_sma: usize,
}

impl Default for AtrParams {
    fn default() -> Self {
        Self {
            lookback: 14,
            contraction_threshold: 0.08,
            fast_sma: 50,
            slow_sma: 200,
        }
    }
}

/// Selectable VCP algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VcpStrategy {
    Swing(SwingParams),
    AtrRatio(AtrParams),
}

impl Default for VcpStrategy {
    fn default() -> Self {
        VcpStrategy::Swing(SwingParams::default())
    }
}

impl VcpStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            VcpStrategy::Swing(_) => "vcp_swing",
            VcpStrategy::AtrRatio(_) => "vcp_atr_ratio",
        }
    }

    pub fn min_bars(&self) -> usize {
        match self {
            VcpStrategy::Swing(p) => p.min_bars.max(3),
            VcpStrategy::AtrRatio(p) => 2 * p.lookback.max(1),
        }
    }

    /// `Ok(None)` means the series was analysed and shows no pattern.
    pub fn analyze(&self, series: &Series) -> Result<Option<VcpSignal>, DetectError> {
        series.require(self.name(), self.min_bars())?;
        match self {
            VcpStrategy::Swing(p) => Ok(swing_vcp(series, p)),
            VcpStrategy::AtrRatio(p) => Ok(atr_vcp(series, p)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Swing {
    High(usize),
    Low(usize),
}

/// Strict 3-point extrema, merged in date order. A high and a low on the same
/// bar are ordered low first.
fn swings(bars: &[Bar]) -> Vec<Swing> {
    let mut out = Vec::new();
    for i in 1..bars.len().saturating_sub(1) {
        let (prev, bar, next) = (&bars[i - 1], &bars[i], &bars[i + 1]);
        if bar.low < prev.low && bar.low < next.low {
            out.push(Swing::Low(i));
        }
        if bar.high > prev.high && bar.high > next.high {
            out.push(Swing::High(i));
        }
    }
    out
}

/// Swings taken in fixed slots (0,1), (2,3), ... A slot that is not
/// high→low is skipped, and the slot ending on the last swing is never used.
fn contractions(bars: &[Bar]) -> Vec<Contraction> {
    let swings = swings(bars);
    let mut out = Vec::new();
    for k in (1..swings.len().saturating_sub(1)).step_by(2) {
        let (Swing::High(h), Swing::Low(l)) = (swings[k - 1], swings[k]) else {
            continue;
        };
        let (high_bar, low_bar) = (&bars[h], &bars[l]);
        let volumes: Vec<f64> = bars[h..=l].iter().map(|b| b.volume as f64).collect();
        out.push(Contraction {
            high_date: high_bar.date,
            high: high_bar.high,
            low_date: low_bar.date,
            low: low_bar.low,
            depth: (high_bar.high - low_bar.low) / high_bar.high,
            mean_volume: mean(&volumes).unwrap_or(0.0),
        });
    }
    out
}

fn swing_vcp(series: &Series, params: &SwingParams) -> Option<VcpSignal> {
    let bars = series.bars();
    let found = contractions(bars);
    if found.len() < params.min_contractions {
        return None;
    }

    let shrinking = found
        .windows(2)
        .all(|w| w[1].depth <= w[0].depth + params.depth_tolerance);
    let deep_enough = found.iter().all(|c| c.depth >= params.min_depth);
    let drying_up = found
        .windows(2)
        .all(|w| w[1].mean_volume <= w[0].mean_volume * (1.0 + params.volume_tolerance));
    if !(shrinking && deep_enough && drying_up) {
        return None;
    }

    let stage = if found.len() >= params.mature_contractions {
        VcpStage::Mature
    } else {
        VcpStage::Early
    };
    Some(VcpSignal {
        stage,
        detected_date: bars[bars.len() - 1].date,
        evidence: VcpEvidence::Swings { contractions: found },
    })
}

fn atr_vcp(series: &Series, params: &AtrParams) -> Option<VcpSignal> {
    let bars = series.bars();
    let n = bars.len();
    let lookback = params.lookback.max(1);
    let atr = MeanAtr::new(lookback).compute(bars);

    let finite = |v: f64| (!v.is_nan()).then_some(v);
    let recent_atr = finite(atr[n - 1])?;
    let prior_atr = finite(atr[n - 1 - lookback])?;
    if prior_atr == 0.0 {
        return None;
    }
    let contraction = (prior_atr - recent_atr) / prior_atr;
    if contraction < params.contraction_threshold {
        return None;
    }

    let sma_fast = Sma::new(params.fast_sma).latest(bars)?;
    let sma_slow = Sma::new(params.slow_sma).latest(bars)?;
    let last = &bars[n - 1];
    if !(last.close > sma_fast && sma_fast > sma_slow) {
        return None;
    }

    Some(VcpSignal {
        stage: VcpStage::Stage2,
        detected_date: last.date,
        evidence: VcpEvidence::AtrRatio {
            recent_atr,
            prior_atr,
            contraction,
            sma_fast,
            sma_slow,
        },
    })
}
