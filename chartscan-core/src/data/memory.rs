//! In-memory series source for tests, fixtures and synthetic runs.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use super::provider::{within, RawRow, SeriesSource, SourceError};
use crate::domain::{Series, SymbolKey};

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: BTreeMap<SymbolKey, Vec<RawRow>>,
    unreachable: BTreeSet<SymbolKey>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: SymbolKey, mut rows: Vec<RawRow>) {
        rows.sort_by_key(|r| r.date);
        self.rows.insert(key, rows);
    }

    pub fn insert_series(&mut self, series: &Series) {
        let rows = series.bars().iter().copied().map(RawRow::from).collect();
        self.insert(series.key().clone(), rows);
    }

    /// Make every fetch for `key` fail as if the backing store were down.
    pub fn mark_unreachable(&mut self, key: SymbolKey) {
        self.unreachable.insert(key);
    }
}

impl SeriesSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_symbols(&self, countries: &[String]) -> Result<Vec<SymbolKey>, SourceError> {
        Ok(self
            .rows
            .keys()
            .chain(self.unreachable.iter())
            .filter(|k| k.in_scope(countries))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }

    fn fetch(
        &self,
        key: &SymbolKey,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<RawRow>, SourceError> {
        if self.unreachable.contains(key) {
            return Err(SourceError::Unreachable(format!("{key} marked unreachable")));
        }
        let rows = self
            .rows
            .get(key)
            .ok_or_else(|| SourceError::SymbolNotFound { key: key.clone() })?;
        Ok(rows
            .iter()
            .filter(|r| within(r.date, start, end))
            .cloned()
            .collect())
    }
}
