//! Parquet series store with Hive-style partitioning.
//!
//! Layout: `{root}/country={COUNTRY}/symbol={SYMBOL}/{year}.parquet`
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Incremental updates: new rows replace stored rows with the same date
//! - OHLCV columns are nullable; nulls survive the round trip and are
//!   dropped later by preparation
//! - Corrupt partitions are quarantined (`{file}.quarantined`) on load

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::provider::{within, RawRow, SeriesSource, SourceError};
use crate::domain::SymbolKey;

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct ParquetStore {
    root: PathBuf,
}

impl ParquetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn symbol_dir(&self, key: &SymbolKey) -> PathBuf {
        self.root
            .join(format!("country={}", key.country))
            .join(format!("symbol={}", key.symbol))
    }

    fn year_path(&self, key: &SymbolKey, year: i32) -> PathBuf {
        self.symbol_dir(key).join(format!("{year}.parquet"))
    }

    /// Merge `rows` into the stored history for `key`.
    ///
    /// Rows sharing a date with stored rows replace them. Only the year
    /// partitions touched by `rows` are rewritten. Returns the number of
    /// rows now stored in the touched partitions.
    pub fn write(&self, key: &SymbolKey, rows: &[RawRow]) -> Result<usize, SourceError> {
        if rows.is_empty() {
            return Err(SourceError::Validation("no rows to store".into()));
        }

        let dir = self.symbol_dir(key);
        fs::create_dir_all(&dir)?;

        let mut by_year: HashMap<i32, BTreeMap<NaiveDate, RawRow>> = HashMap::new();
        for row in rows {
            by_year
                .entry(row.date.year())
                .or_default()
                .insert(row.date, row.clone());
        }

        let mut written = 0;
        for (year, incoming) in by_year {
            let path = self.year_path(key, year);
            let mut merged: BTreeMap<NaiveDate, RawRow> = if path.exists() {
                load_partition(&path)?
                    .into_iter()
                    .map(|r| (r.date, r))
                    .collect()
            } else {
                BTreeMap::new()
            };
            merged.extend(incoming);

            let partition: Vec<RawRow> = merged.into_values().collect();
            let mut df = rows_to_dataframe(&partition)?;
            let tmp_path = path.with_extension("parquet.tmp");
            write_parquet(&mut df, &tmp_path)?;
            fs::rename(&tmp_path, &path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                SourceError::Io(e)
            })?;
            written += partition.len();
        }

        Ok(written)
    }

    /// Load every stored row for `key`, sorted by date.
    pub fn load(&self, key: &SymbolKey) -> Result<Vec<RawRow>, SourceError> {
        let dir = self.symbol_dir(key);
        if !dir.exists() {
            return Err(SourceError::SymbolNotFound { key: key.clone() });
        }

        let mut rows = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }
            match load_partition(&path) {
                Ok(part) => rows.extend(part),
                Err(e) => {
                    let quarantine = path.with_extension("parquet.quarantined");
                    warn!(path = %path.display(), error = %e, "quarantining corrupt partition");
                    let _ = fs::rename(&path, &quarantine);
                }
            }
        }

        if rows.is_empty() {
            return Err(SourceError::SymbolNotFound { key: key.clone() });
        }
        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }
}

impl SeriesSource for ParquetStore {
    fn name(&self) -> &str {
        "parquet"
    }

    fn list_symbols(&self, countries: &[String]) -> Result<Vec<SymbolKey>, SourceError> {
        let mut keys = Vec::new();
        if !self.root.exists() {
            return Ok(keys);
        }
        for country_entry in fs::read_dir(&self.root)? {
            let country_path = country_entry?.path();
            let Some(country) = partition_value(&country_path, "country=") else {
                continue;
            };
            if !countries.is_empty() && !countries.iter().any(|c| c == &country) {
                continue;
            }
            for symbol_entry in fs::read_dir(&country_path)? {
                let symbol_path = symbol_entry?.path();
                if let Some(symbol) = partition_value(&symbol_path, "symbol=") {
                    keys.push(SymbolKey::new(symbol, country.clone()));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn fetch(
        &self,
        key: &SymbolKey,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<RawRow>, SourceError> {
        let rows = self.load(key)?;
        Ok(rows
            .into_iter()
            .filter(|r| within(r.date, start, end))
            .collect())
    }
}

fn partition_value(path: &Path, prefix: &str) -> Option<String> {
    if !path.is_dir() {
        return None;
    }
    path.file_name()?
        .to_str()?
        .strip_prefix(prefix)
        .map(str::to_string)
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn rows_to_dataframe(rows: &[RawRow]) -> Result<DataFrame, SourceError> {
    let dates: Vec<i32> = rows
        .iter()
        .map(|r| (r.date - epoch()).num_days() as i32)
        .collect();
    let opens: Vec<Option<f64>> = rows.iter().map(|r| r.open).collect();
    let highs: Vec<Option<f64>> = rows.iter().map(|r| r.high).collect();
    let lows: Vec<Option<f64>> = rows.iter().map(|r| r.low).collect();
    let closes: Vec<Option<f64>> = rows.iter().map(|r| r.close).collect();
    let volumes: Vec<Option<u64>> = rows.iter().map(|r| r.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| SourceError::Parquet(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| SourceError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), SourceError> {
    let file = fs::File::create(path)?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| SourceError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_partition(path: &Path) -> Result<Vec<RawRow>, SourceError> {
    let file = fs::File::open(path)?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| SourceError::Parquet(format!("read: {e}")))?;

    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(SourceError::Validation(format!("missing column '{name}'")));
        }
    }
    dataframe_to_rows(&df)
}

fn dataframe_to_rows(df: &DataFrame) -> Result<Vec<RawRow>, SourceError> {
    let col_err = |e: PolarsError| SourceError::Parquet(format!("column read: {e}"));

    let date_ca = df.column("date").map_err(col_err)?.date().map_err(col_err)?;
    let open_ca = df.column("open").map_err(col_err)?.f64().map_err(col_err)?;
    let high_ca = df.column("high").map_err(col_err)?.f64().map_err(col_err)?;
    let low_ca = df.column("low").map_err(col_err)?.f64().map_err(col_err)?;
    let close_ca = df.column("close").map_err(col_err)?.f64().map_err(col_err)?;
    let vol_ca = df.column("volume").map_err(col_err)?.u64().map_err(col_err)?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| SourceError::Validation(format!("null date at row {i}")))?;
        rows.push(RawRow {
            date: epoch() + chrono::Duration::days(days as i64),
            open: open_ca.get(i),
            high: high_ca.get(i),
            low: low_ca.get(i),
            close: close_ca.get(i),
            volume: vol_ca.get(i),
        });
    }
    Ok(rows)
}
