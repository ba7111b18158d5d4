//! Result stores: the screened universe and detected VCP rows.
//!
//! Every call is scoped by an explicit country list or an explicit
//! `(symbol, country)` key, so a run never touches rows outside its scope.
//! Two implementations: [`MemoryStore`] for tests and embedding, and
//! [`JsonStore`], one JSON document per table in a directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use chartscan_core::domain::SymbolKey;
use chartscan_core::patterns::VcpStage;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store table {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("store lock poisoned")]
    Poisoned,
}

/// A symbol in the screened universe.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScreenedRow {
    pub symbol: String,
    pub country: String,
}

impl ScreenedRow {
    pub fn key(&self) -> SymbolKey {
        SymbolKey::new(&self.symbol, &self.country)
    }
}

impl From<&SymbolKey> for ScreenedRow {
    fn from(key: &SymbolKey) -> Self {
        Self {
            symbol: key.symbol.clone(),
            country: key.country.clone(),
        }
    }
}

/// A symbol showing a VCP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcpRow {
    pub symbol: String,
    pub country: String,
    pub stage: VcpStage,
    /// Run date on which the row was inserted or its stage last changed.
    pub detected_date: NaiveDate,
}

impl VcpRow {
    pub fn key(&self) -> SymbolKey {
        SymbolKey::new(&self.symbol, &self.country)
    }
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    Unchanged,
}

pub trait ScreenedStore: Send + Sync {
    /// Rows whose country is in `countries`; every row when it is empty.
    fn list_screened(&self, countries: &[String]) -> Result<Vec<ScreenedRow>, StoreError>;
    fn upsert_screened(&self, key: &SymbolKey) -> Result<Upsert, StoreError>;
    /// Returns whether a row was removed.
    fn delete_screened(&self, key: &SymbolKey) -> Result<bool, StoreError>;
}

pub trait VcpStore: Send + Sync {
    fn list_vcp(&self, countries: &[String]) -> Result<Vec<VcpRow>, StoreError>;
    /// Insert, or change the stage. An unchanged stage keeps its original
    /// detection date.
    fn upsert_vcp(&self, key: &SymbolKey, stage: VcpStage, detected_date: NaiveDate) -> Result<Upsert, StoreError>;
    fn delete_vcp(&self, key: &SymbolKey) -> Result<bool, StoreError>;
}

/// Both tables, keyed by symbol and country.
#[derive(Debug, Clone, Default, PartialEq)]
struct Tables {
    screened: BTreeMap<SymbolKey, ScreenedRow>,
    vcp: BTreeMap<SymbolKey, VcpRow>,
}

impl Tables {
    fn list_screened(&self, countries: &[String]) -> Vec<ScreenedRow> {
        self.screened
            .iter()
            .filter(|(key, _)| key.in_scope(countries))
            .map(|(_, row)| row.clone())
            .collect()
    }

    fn upsert_screened(&mut self, key: &SymbolKey) -> Upsert {
        if self.screened.contains_key(key) {
            return Upsert::Unchanged;
        }
        self.screened.insert(key.clone(), ScreenedRow::from(key));
        Upsert::Inserted
    }

    fn list_vcp(&self, countries: &[String]) -> Vec<VcpRow> {
        self.vcp
            .iter()
            .filter(|(key, _)| key.in_scope(countries))
            .map(|(_, row)| row.clone())
            .collect()
    }

    fn upsert_vcp(&mut self, key: &SymbolKey, stage: VcpStage, detected_date: NaiveDate) -> Upsert {
        match self.vcp.get_mut(key) {
            Some(row) if row.stage == stage => Upsert::Unchanged,
            Some(row) => {
                row.stage = stage;
                row.detected_date = detected_date;
                Upsert::Updated
            }
            None => {
                self.vcp.insert(
                    key.clone(),
                    VcpRow {
                        symbol: key.symbol.clone(),
                        country: key.country.clone(),
                        stage,
                        detected_date,
                    },
                );
                Upsert::Inserted
            }
        }
    }
}

// ─── In-memory store ────────────────────────────────────────────────

/// In-process store holding both tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&tables))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut tables))
    }
}

impl ScreenedStore for MemoryStore {
    fn list_screened(&self, countries: &[String]) -> Result<Vec<ScreenedRow>, StoreError> {
        self.read(|t| t.list_screened(countries))
    }

    fn upsert_screened(&self, key: &SymbolKey) -> Result<Upsert, StoreError> {
        self.write(|t| t.upsert_screened(key))
    }

    fn delete_screened(&self, key: &SymbolKey) -> Result<bool, StoreError> {
        self.write(|t| t.screened.remove(key).is_some())
    }
}

impl VcpStore for MemoryStore {
    fn list_vcp(&self, countries: &[String]) -> Result<Vec<VcpRow>, StoreError> {
        self.read(|t| t.list_vcp(countries))
    }

    fn upsert_vcp(&self, key: &SymbolKey, stage: VcpStage, detected_date: NaiveDate) -> Result<Upsert, StoreError> {
        self.write(|t| t.upsert_vcp(key, stage, detected_date))
    }

    fn delete_vcp(&self, key: &SymbolKey) -> Result<bool, StoreError> {
        self.write(|t| t.vcp.remove(key).is_some())
    }
}

// ─── JSON directory store ───────────────────────────────────────────

const SCREENED_FILE: &str = "screened.json";
const VCP_FILE: &str = "vcp.json";

/// Tables persisted as `screened.json` and `vcp.json` under one directory.
///
/// Each mutation rewrites its table atomically (write `.tmp`, then rename).
/// A missing file is an empty table.
#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    /// Open (and create, if needed) a store directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(file);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            path,
            reason: e.to_string(),
        })
    }

    fn save<T: Serialize>(&self, file: &str, rows: &[T]) -> Result<(), StoreError> {
        let path = self.dir.join(file);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(rows).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), rows = rows.len(), "store table written");
        Ok(())
    }

    fn load_tables(&self) -> Result<Tables, StoreError> {
        let screened: Vec<ScreenedRow> = self.load(SCREENED_FILE)?;
        let vcp: Vec<VcpRow> = self.load(VCP_FILE)?;
        Ok(Tables {
            screened: screened.into_iter().map(|r| (r.key(), r)).collect(),
            vcp: vcp.into_iter().map(|r| (r.key(), r)).collect(),
        })
    }

    /// Run `f` on the current tables and persist whatever it changed.
    fn update<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let before = self.load_tables()?;
        let mut tables = before.clone();
        let out = f(&mut tables);
        if tables.screened != before.screened {
            let rows: Vec<&ScreenedRow> = tables.screened.values().collect();
            self.save(SCREENED_FILE, &rows)?;
        }
        if tables.vcp != before.vcp {
            let rows: Vec<&VcpRow> = tables.vcp.values().collect();
            self.save(VCP_FILE, &rows)?;
        }
        Ok(out)
    }

    fn query<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&self.load_tables()?))
    }
}

impl ScreenedStore for JsonStore {
    fn list_screened(&self, countries: &[String]) -> Result<Vec<ScreenedRow>, StoreError> {
        self.query(|t| t.list_screened(countries))
    }

    fn upsert_screened(&self, key: &SymbolKey) -> Result<Upsert, StoreError> {
        self.update(|t| t.upsert_screened(key))
    }

    fn delete_screened(&self, key: &SymbolKey) -> Result<bool, StoreError> {
        self.update(|t| t.screened.remove(key).is_some())
    }
}

impl VcpStore for JsonStore {
    fn list_vcp(&self, countries: &[String]) -> Result<Vec<VcpRow>, StoreError> {
        self.query(|t| t.list_vcp(countries))
    }

    fn upsert_vcp(&self, key: &SymbolKey, stage: VcpStage, detected_date: NaiveDate) -> Result<Upsert, StoreError> {
        self.update(|t| t.upsert_vcp(key, stage, detected_date))
    }

    fn delete_vcp(&self, key: &SymbolKey) -> Result<bool, StoreError> {
        self.update(|t| t.vcp.remove(key).is_some())
    }
}
