//! Simple Moving Average (SMA) of close.
//!
//! Lookback: period - 1 (first valid value at index period-1).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    /// Periods below 1 are treated as 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        let mut sum: f64 = bars[..self.period].iter().map(|b| b.close).sum();
        result[self.period - 1] = sum / self.period as f64;

        for i in self.period..n {
            sum += bars[i].close - bars[i - self.period].close;
            result[i] = sum / self.period as f64;
        }
        result
    }

    /// Mean of the last `period` closes, computed directly.
    fn latest(&self, bars: &[Bar]) -> Option<f64> {
        if bars.len() < self.period {
            return None;
        }
        let window = &bars[bars.len() - self.period..];
        Some(window.iter().map(|b| b.close).sum::<f64>() / self.period as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let result = Sma::new(5).compute(&bars);

        assert_eq!(result.len(), 7);
        for v in &result[..4] {
            assert!(v.is_nan());
        }
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
        assert_approx(result[5], 13.0, DEFAULT_EPSILON);
        assert_approx(result[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn latest_matches_last_computed_value() {
        let bars = make_bars(&[3.0, 9.0, 4.0, 8.0, 5.0, 7.0]);
        let sma = Sma::new(4);
        let full = sma.compute(&bars);
        assert_approx(sma.latest(&bars).unwrap(), full[5], DEFAULT_EPSILON);
    }

    #[test]
    fn too_few_bars() {
        let bars = make_bars(&[10.0, 11.0]);
        let sma = Sma::new(5);
        assert!(sma.compute(&bars).iter().all(|v| v.is_nan()));
        assert_eq!(sma.latest(&bars), None);
    }

    #[test]
    fn lookback_and_name() {
        assert_eq!(Sma::new(50).lookback(), 49);
        assert_eq!(Sma::new(200).name(), "sma_200");
    }
}
