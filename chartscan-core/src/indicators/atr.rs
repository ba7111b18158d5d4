//! True range and a simple-mean ATR.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|); the first
//! bar has no previous close and uses high-low.
//! `MeanAtr` is the plain rolling mean of true range (no Wilder smoothing).

use super::Indicator;
use crate::domain::Bar;

/// Compute the True Range series from bars.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hl = bar.high - bar.low;
            if i == 0 {
                return hl;
            }
            let pc = bars[i - 1].close;
            hl.max((bar.high - pc).abs()).max((bar.low - pc).abs())
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct MeanAtr {
    period: usize,
    name: String,
}

impl MeanAtr {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("mean_atr_{period}"),
        }
    }
}

impl Indicator for MeanAtr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let tr = true_range(bars);
        let mut result = vec![f64::NAN; tr.len()];
        if tr.len() < self.period {
            return result;
        }
        let mut sum: f64 = tr[..self.period].iter().sum();
        result[self.period - 1] = sum / self.period as f64;
        for i in self.period..tr.len() {
            sum += tr[i] - tr[i - self.period];
            result[i] = sum / self.period as f64;
        }
        result
    }
}
