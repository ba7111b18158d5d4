//! Support and resistance levels.
//!
//! Two strategies coexist:
//! - **Pivot zones**: HIGH/LOW pivots are chained into price clusters and
//!   emitted as flat levels (one member) or width-capped bands.
//! - **Monotonic runs**: a bar is support when lows fall into it and rise out
//!   of it (resistance mirrors this on highs); raw levels are collapsed when
//!   they sit within a small fraction of each other.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pivot::{find_pivots, Pivot, PivotKind, PivotWindow};
use crate::domain::{Bar, Series};

/// A price level or zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub low: f64,
    pub high: f64,
    pub mean: f64,
    /// Number of raw prices merged into this level.
    pub members: usize,
}

impl Level {
    pub fn flat(price: f64) -> Self {
        Self {
            low: price,
            high: price,
            mean: price,
            members: 1,
        }
    }

    /// A single-price level, as opposed to a band.
    pub fn is_flat(&self) -> bool {
        self.low == self.high
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

/// Cluster tolerances, both fractions of price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// A price joins a cluster when it is within this fraction of any member.
    pub max_gap: f64,
    /// Emitted band width is capped at this fraction of the cluster mean.
    pub max_zone_width: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            max_gap: 0.05,
            max_zone_width: 0.05,
        }
    }
}

/// Greedy chain clustering of prices.
///
/// Prices are sorted ascending and a cluster keeps growing while the next
/// price lies within `max_gap` of any price already in it. Chaining can make
/// a cluster wider than `max_gap`; the cap is applied only to the emitted
/// band. Non-finite and non-positive prices are ignored.
pub fn cluster_prices(prices: &[f64], params: &ClusterParams) -> Vec<Level> {
    let mut sorted: Vec<f64> = prices
        .iter()
        .copied()
        .filter(|p| p.is_finite() && *p > 0.0)
        .collect();
    sorted.sort_by(f64::total_cmp);

    let mut levels = Vec::new();
    let mut cluster: Vec<f64> = Vec::new();
    for price in sorted {
        let joins = cluster
            .iter()
            .any(|member| (price - member).abs() / member <= params.max_gap);
        if !cluster.is_empty() && !joins {
            levels.push(emit_cluster(&cluster, params.max_zone_width));
            cluster.clear();
        }
        cluster.push(price);
    }
    if !cluster.is_empty() {
        levels.push(emit_cluster(&cluster, params.max_zone_width));
    }
    levels
}

fn emit_cluster(members: &[f64], max_zone_width: f64) -> Level {
    if members.len() == 1 {
        return Level::flat(members[0]);
    }
    let mean = members.iter().sum::<f64>() / members.len() as f64;
    let min = members.iter().copied().fold(f64::INFINITY, f64::min);
    let max = members.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min).min(max_zone_width * mean);
    Level {
        low: mean - width / 2.0,
        high: mean + width / 2.0,
        mean,
        members: members.len(),
    }
}

/// Levels found on one series, plus the pivots they were built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: Vec<Level>,
    pub resistance: Vec<Level>,
    pub pivots: Vec<Pivot>,
}

impl SupportResistance {
    /// Representative prices of the resistance levels, ascending.
    pub fn resistance_prices(&self) -> Vec<f64> {
        self.resistance.iter().map(|l| l.mean).collect()
    }

    pub fn support_prices(&self) -> Vec<f64> {
        self.support.iter().map(|l| l.mean).collect()
    }
}

/// Selectable support/resistance algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LevelStrategy {
    PivotZones {
        window: PivotWindow,
        clustering: ClusterParams,
    },
    MonotonicRuns {
        before: usize,
        after: usize,
        /// Levels closer than this fraction of the previous kept level collapse.
        min_separation: f64,
    },
}

impl LevelStrategy {
    pub fn pivot_zones() -> Self {
        LevelStrategy::PivotZones {
            window: PivotWindow::ZONES,
            clustering: ClusterParams::default(),
        }
    }

    pub fn monotonic_runs() -> Self {
        LevelStrategy::MonotonicRuns {
            before: 3,
            after: 2,
            min_separation: 0.005,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LevelStrategy::PivotZones { .. } => "pivot_zones",
            LevelStrategy::MonotonicRuns { .. } => "monotonic_runs",
        }
    }

    /// Bars required before any level can be found.
    pub fn min_bars(&self) -> usize {
        match self {
            LevelStrategy::PivotZones { window, .. } => window.span(),
            LevelStrategy::MonotonicRuns { before, after, .. } => before + after + 1,
        }
    }

    /// Run the strategy. Short series yield no levels.
    pub fn levels(&self, series: &Series) -> SupportResistance {
        let result = match *self {
            LevelStrategy::PivotZones { window, clustering } => pivot_zones(series, window, &clustering),
            LevelStrategy::MonotonicRuns {
                before,
                after,
                min_separation,
            } => monotonic_runs(series, before, after, min_separation),
        };
        debug!(
            symbol = series.symbol(),
            strategy = self.name(),
            support = result.support.len(),
            resistance = result.resistance.len(),
            "levels detected"
        );
        result
    }
}

impl Default for LevelStrategy {
    fn default() -> Self {
        Self::pivot_zones()
    }
}

fn pivot_zones(series: &Series, window: PivotWindow, clustering: &ClusterParams) -> SupportResistance {
    let pivots = find_pivots(series, window);
    let prices_of = |kind: PivotKind| -> Vec<f64> {
        pivots
            .iter()
            .filter(|p| p.kind == kind)
            .filter_map(Pivot::price)
            .collect()
    };
    SupportResistance {
        support: cluster_prices(&prices_of(PivotKind::Low), clustering),
        resistance: cluster_prices(&prices_of(PivotKind::High), clustering),
        pivots,
    }
}

/// Lows non-increasing over the `before` steps into `position` and
/// non-decreasing over the `after` steps out of it.
fn is_run_support(bars: &[Bar], position: usize, before: usize, after: usize) -> bool {
    if position < before || position + after >= bars.len() {
        return false;
    }
    let falling = (position + 1 - before..=position).all(|i| bars[i].low <= bars[i - 1].low);
    let rising = (position + 1..=position + after).all(|i| bars[i].low >= bars[i - 1].low);
    falling && rising
}

fn is_run_resistance(bars: &[Bar], position: usize, before: usize, after: usize) -> bool {
    if position < before || position + after >= bars.len() {
        return false;
    }
    let rising = (position + 1 - before..=position).all(|i| bars[i].high >= bars[i - 1].high);
    let falling = (position + 1..=position + after).all(|i| bars[i].high <= bars[i - 1].high);
    rising && falling
}

fn monotonic_runs(series: &Series, before: usize, after: usize, min_separation: f64) -> SupportResistance {
    let bars = series.bars();
    let mut pivots = Vec::new();
    let mut support = Vec::new();
    let mut resistance = Vec::new();

    for (position, bar) in bars.iter().enumerate() {
        let is_support = is_run_support(bars, position, before, after);
        let is_resistance = is_run_resistance(bars, position, before, after);
        if is_support {
            support.push(bar.low);
        }
        if is_resistance {
            resistance.push(bar.high);
        }
        let kind = match (is_support, is_resistance) {
            (true, true) => PivotKind::Both,
            (true, false) => PivotKind::Low,
            (false, true) => PivotKind::High,
            (false, false) => continue,
        };
        pivots.push(Pivot {
            position,
            date: bar.date,
            kind,
            low: bar.low,
            high: bar.high,
        });
    }

    SupportResistance {
        support: separate_levels(&support, min_separation),
        resistance: separate_levels(&resistance, min_separation),
        pivots,
    }
}

/// Sequential de-duplication: keep a price only if it differs from the last
/// kept price by more than `min_separation` of that price. Dropped prices are
/// counted as members of the level they collapsed into.
pub fn separate_levels(prices: &[f64], min_separation: f64) -> Vec<Level> {
    let mut sorted: Vec<f64> = prices
        .iter()
        .copied()
        .filter(|p| p.is_finite() && *p > 0.0)
        .collect();
    sorted.sort_by(f64::total_cmp);

    let mut levels: Vec<Level> = Vec::new();
    for price in sorted {
        match levels.last_mut() {
            Some(last) if (price - last.mean).abs() / last.mean <= min_separation => {
                last.members += 1;
            }
            _ => levels.push(Level::flat(price)),
        }
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SymbolKey;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    #[test]
    fn single_price_is_flat() {
        let levels = cluster_prices(&[50.0], &ClusterParams::default());
        assert_eq!(levels, vec![Level::flat(50.0)]);
        assert!(levels[0].is_flat());
    }

    #[test]
    fn far_prices_stay_separate() {
        let levels = cluster_prices(&[100.0, 200.0, 101.0], &ClusterParams::default());
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].members, 2);
        assert_eq!(levels[1], Level::flat(200.0));
    }

    #[test]
    fn band_is_centered_on_mean() {
        let levels = cluster_prices(&[100.0, 102.0], &ClusterParams::default());
        assert_eq!(levels.len(), 1);
        let level = levels[0];
        assert_approx(level.mean, 101.0, DEFAULT_EPSILON);
        assert_approx(level.low, 100.0, DEFAULT_EPSILON);
        assert_approx(level.high, 102.0, DEFAULT_EPSILON);
    }

    #[test]
    fn chaining_joins_beyond_max_gap_and_width_is_capped() {
        // Each step is 4%, so the chain spans ~17% end to end.
        let prices = [100.0, 104.0, 108.16, 112.4864, 116.985856];
        let levels = cluster_prices(&prices, &ClusterParams::default());
        assert_eq!(levels.len(), 1);

        let level = levels[0];
        assert_eq!(level.members, 5);
        assert_approx(level.width(), 0.05 * level.mean, 1e-9);
        assert_approx((level.low + level.high) / 2.0, level.mean, 1e-9);
    }

    #[test]
    fn ignores_invalid_prices() {
        let levels = cluster_prices(&[f64::NAN, -1.0, 0.0, 10.0], &ClusterParams::default());
        assert_eq!(levels, vec![Level::flat(10.0)]);
    }

    #[test]
    fn separate_levels_collapses_close_prices() {
        let levels = separate_levels(&[100.0, 100.4, 100.6, 101.0], 0.005);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].mean, 100.0);
        assert_eq!(levels[0].members, 2);
        assert_eq!(levels[1].mean, 100.6);
        assert_eq!(levels[1].members, 2);
    }

    fn series_from_lows_highs(points: &[(f64, f64)]) -> Series {
        let base = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let bars = points
            .iter()
            .enumerate()
            .map(|(i, &(low, high))| Bar {
                date: base + chrono::Duration::days(i as i64),
                open: (low + high) / 2.0,
                high,
                low,
                close: (low + high) / 2.0,
                volume: 500,
            })
            .collect();
        Series::new(SymbolKey::new("LV", "usa"), bars).unwrap()
    }

    #[test]
    fn monotonic_runs_find_valley_and_peak() {
        let series = series_from_lows_highs(&[
            (20.0, 22.0),
            (19.0, 21.0),
            (18.0, 20.0),
            (17.0, 19.0),
            (18.0, 20.0),
            (19.0, 23.0),
            (20.0, 24.0),
            (21.0, 25.0),
            (20.0, 24.0),
            (19.0, 23.0),
            (18.0, 22.0),
        ]);
        let result = LevelStrategy::monotonic_runs().levels(&series);

        assert_eq!(result.support, vec![Level::flat(17.0)]);
        assert_eq!(result.resistance, vec![Level::flat(25.0)]);
        assert_eq!(result.pivots.len(), 2);
        assert_eq!(result.pivots[0].position, 3);
        assert_eq!(result.pivots[1].position, 7);
    }

    #[test]
    fn short_series_has_no_levels() {
        let series = series_from_lows_highs(&[(10.0, 11.0), (9.0, 10.0)]);
        for strategy in [LevelStrategy::pivot_zones(), LevelStrategy::monotonic_runs()] {
            let result = strategy.levels(&series);
            assert!(result.support.is_empty());
            assert!(result.resistance.is_empty());
        }
    }

    #[test]
    fn strategy_toml_shape() {
        let json = serde_json::to_string(&LevelStrategy::monotonic_runs()).unwrap();
        assert!(json.contains("\"kind\":\"monotonic_runs\""));
        let back: LevelStrategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LevelStrategy::monotonic_runs());
    }
}
