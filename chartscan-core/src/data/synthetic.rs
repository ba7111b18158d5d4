//! Deterministic synthetic bar histories for demos and benchmarks.
//!
//! A random walk of weekday bars seeded from the BLAKE3 hash of the symbol,
//! so the same symbol always yields the same history.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::RawRow;

/// Shape of the generated walk.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticParams {
    pub start_price: f64,
    /// Mean daily return.
    pub drift: f64,
    /// Half-width of the uniform daily return band.
    pub volatility: f64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            drift: 0.0005,
            volatility: 0.03,
        }
    }
}

/// Generate weekday rows for `symbol` over `[start, end]`.
pub fn generate(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    params: &SyntheticParams,
) -> Vec<RawRow> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut rows = Vec::new();
    let mut price = params.start_price;
    let mut current = start;

    while current <= end {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return = params.drift + rng.gen_range(-params.volatility..params.volatility);
        let open = price;
        let close = (price * (1.0 + daily_return)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        rows.push(RawRow {
            date: current,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    rows
}
