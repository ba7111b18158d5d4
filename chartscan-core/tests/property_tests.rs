//! Property tests for detector invariants.
//!
//! Uses proptest to verify:
//! 1. Edge policy: positions without a full window are never pivots
//! 2. BOTH pivots sit on the window minimum low and maximum high
//! 3. Clustering level representatives reproduces the same cluster count
//! 4. Trend-template flags match their definitions; qualifying needs all
//! 5. Target/stop mode brackets the close
//! 6. ATR-ratio VCP never divides by a zero prior ATR
//! 7. Fewer than two pivots of a side means no trend line
//! 8. Preparation yields an ordered, sane series

use chartscan_core::data::{prepare, RawRow};
use chartscan_core::domain::{Bar, Series, SymbolKey};
use chartscan_core::patterns::{
    breakout_targets, build_trend_line, cluster_prices, pivot_at, AtrParams, ClusterParams, Pivot,
    PivotKind, PivotSide, PivotWindow, TargetParams, TrendTemplate, VcpStrategy,
};
use chrono::NaiveDate;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, 4).unwrap()
}

fn arb_bars(max_len: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((10.0..200.0_f64, 0.0..10.0_f64), 1..max_len).prop_map(|pairs| {
        pairs
            .into_iter()
            .enumerate()
            .map(|(i, (low, spread))| Bar {
                date: base_date() + chrono::Duration::days(i as i64),
                open: low + spread / 2.0,
                high: low + spread,
                low,
                close: low + spread / 2.0,
                volume: 1_000,
            })
            .collect()
    })
}

fn arb_window() -> impl Strategy<Value = PivotWindow> {
    (0usize..12, 0usize..12).prop_map(|(before, after)| PivotWindow::new(before, after))
}

fn arb_prices() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..1000.0_f64, 0..60)
}

// ── 1. Edge policy ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn positions_near_edges_are_none(bars in arb_bars(80), window in arb_window()) {
        for position in 0..bars.len() + 3 {
            if position < window.before || position + window.after > bars.len().saturating_sub(1) {
                prop_assert_eq!(pivot_at(&bars, position, window), PivotKind::None);
            }
        }
    }
}

// ── 2. BOTH pivots ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn both_only_on_window_extremes(bars in arb_bars(80), window in arb_window()) {
        for position in 0..bars.len() {
            if pivot_at(&bars, position, window) != PivotKind::Both {
                continue;
            }
            let neighbourhood = &bars[position - window.before..=position + window.after];
            let min_low = neighbourhood.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let max_high = neighbourhood.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(bars[position].low, min_low);
            prop_assert_eq!(bars[position].high, max_high);
        }
    }
}

// ── 3. Clustering idempotence ────────────────────────────────────────

proptest! {
    #[test]
    fn clustering_representatives_is_stable(prices in arb_prices(), gap in 0.001..0.2_f64) {
        let params = ClusterParams { max_gap: gap, max_zone_width: 0.05 };
        let levels = cluster_prices(&prices, &params);
        let representatives: Vec<f64> = levels.iter().map(|l| l.mean).collect();
        let again = cluster_prices(&representatives, &params);
        prop_assert_eq!(again.len(), levels.len());
    }

    #[test]
    fn bands_never_exceed_cap(prices in arb_prices(), cap in 0.001..0.2_f64) {
        let params = ClusterParams { max_gap: 0.05, max_zone_width: cap };
        for level in cluster_prices(&prices, &params) {
            prop_assert!(level.width() <= cap * level.mean + 1e-9);
            prop_assert!(level.low <= level.mean && level.mean <= level.high);
        }
    }
}

// ── 4. Trend template ────────────────────────────────────────────────

proptest! {
    #[test]
    fn qualification_needs_every_criterion(bars in arb_bars(300)) {
        prop_assume!(bars.len() >= 50);
        let series = Series::new(SymbolKey::new("PT", "usa"), bars).unwrap();
        let template = TrendTemplate::default();
        let report = template.evaluate(&series).unwrap();
        let c = report.criteria;

        prop_assert_eq!(c.above_year_low, report.close >= template.min_above_low * report.year_low);
        prop_assert_eq!(c.near_year_high, report.close >= template.min_of_high * report.year_high);
        match (report.sma_fast, report.sma_mid, report.sma_slow) {
            (Some(fast), Some(mid), Some(slow)) => {
                prop_assert_eq!(
                    c.above_averages,
                    report.close >= fast && report.close >= mid && report.close >= slow
                );
                prop_assert_eq!(c.fast_above_mid, fast >= mid);
                prop_assert_eq!(c.mid_above_slow, mid >= slow);
            }
            _ => prop_assert!(!report.qualifies),
        }
        prop_assert_eq!(report.qualifies, c.as_array().iter().all(|&f| f));
    }
}

// ── 5. Target/stop mode ──────────────────────────────────────────────

proptest! {
    #[test]
    fn targets_bracket_the_close(
        open in 50.0..150.0_f64,
        close in 50.0..150.0_f64,
        levels in prop::collection::vec(40.0..200.0_f64, 0..10),
    ) {
        let params = TargetParams::default();
        match breakout_targets(open, close, &levels, &params) {
            Some(t) => {
                prop_assert!(open < t.breakout_level && t.breakout_level < close);
                prop_assert!(t.profit_target >= close);
                prop_assert!(t.stop_price <= close);
                prop_assert!(t.stop_loss_percentage <= params.max_stop_loss);
            }
            None => prop_assert!(!levels.iter().any(|l| open < *l && *l < close)),
        }
    }
}

// ── 6. ATR-ratio on flat prices ──────────────────────────────────────

proptest! {
    #[test]
    fn constant_prices_have_no_atr_signal(price in 1.0..500.0_f64, len in 28usize..260) {
        let bars = (0..len)
            .map(|i| Bar {
                date: base_date() + chrono::Duration::days(i as i64),
                open: price,
                high: price,
                low: price,
                close: price,
                volume: 0,
            })
            .collect();
        let series = Series::new(SymbolKey::new("FLAT", "usa"), bars).unwrap();
        let strategy = VcpStrategy::AtrRatio(AtrParams::default());
        prop_assert_eq!(strategy.analyze(&series).unwrap(), None);
    }
}

// ── 7. Trend lines ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn one_pivot_is_no_trend_line(day in 0i64..300, high in 1.0..100.0_f64) {
        let pivots = vec![Pivot {
            position: day as usize,
            date: base_date() + chrono::Duration::days(day),
            kind: PivotKind::High,
            low: high - 1.0,
            high,
        }];
        prop_assert_eq!(build_trend_line(&pivots, PivotSide::High), Ok(None));
        prop_assert_eq!(build_trend_line(&pivots, PivotSide::Low), Ok(None));
    }
}

// ── 8. Preparation ───────────────────────────────────────────────────

fn arb_rows() -> impl Strategy<Value = Vec<RawRow>> {
    prop::collection::vec(
        (0i64..40, prop::option::weighted(0.9, 10.0..100.0_f64), 0.0..5.0_f64),
        0..80,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(day, low, spread)| RawRow {
                date: base_date() + chrono::Duration::days(day),
                open: low.map(|l| l + spread / 2.0),
                high: low.map(|l| l + spread),
                low,
                close: low.map(|l| l + spread / 2.0),
                volume: Some(100),
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn prepared_series_is_ordered_and_sane(rows in arb_rows()) {
        let prepared = prepare(SymbolKey::new("P", "usa"), rows);
        let bars = prepared.series.bars();
        prop_assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
        prop_assert!(bars.iter().all(Bar::is_sane));
    }
}
