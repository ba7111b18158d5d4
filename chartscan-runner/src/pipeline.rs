//! Per-symbol fetch → prepare → detect, fanned out over rayon.
//!
//! Detection is collected for every candidate before the caller mutates any
//! store, so a delete pass always sees the complete qualifying set.

use chartscan_core::data::{prepare, SeriesSource, SourceError};
use chartscan_core::domain::{Series, SymbolKey};
use chartscan_core::DetectError;
use chrono::NaiveDate;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::import::ImportError;
use crate::store::StoreError;

/// Errors that abort a runner operation.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("detection error: {0}")]
    Detect(#[from] DetectError),
    #[error("import error: {0}")]
    Import(#[from] ImportError),
}

/// Result of one candidate.
#[derive(Debug)]
pub enum Outcome<T> {
    Qualified(T),
    NotQualified,
    /// The detector could not judge the series (e.g. too short).
    Skipped(DetectError),
    /// The series could not be fetched.
    Failed(SourceError),
}

impl<T> Outcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Fetch and prepare one series. Integrity warnings are logged by `prepare`.
pub fn load_series(
    source: &dyn SeriesSource,
    key: &SymbolKey,
    start: Option<NaiveDate>,
) -> Result<Series, SourceError> {
    let rows = source.fetch(key, start, None)?;
    Ok(prepare(key.clone(), rows).series)
}

/// Run `detect` over every candidate in parallel. `Ok(None)` from the
/// detector means "analysed, does not qualify".
pub fn scan<T, F>(source: &dyn SeriesSource, candidates: &[SymbolKey], detect: F) -> Vec<(SymbolKey, Outcome<T>)>
where
    T: Send,
    F: Fn(&Series) -> Result<Option<T>, DetectError> + Sync,
{
    candidates
        .par_iter()
        .map(|key| {
            let outcome = match load_series(source, key, None) {
                Err(e) => {
                    warn!(symbol = %key, error = %e, "fetch failed, leaving stored rows untouched");
                    Outcome::Failed(e)
                }
                Ok(series) => match detect(&series) {
                    Ok(Some(found)) => Outcome::Qualified(found),
                    Ok(None) => Outcome::NotQualified,
                    Err(e) => {
                        debug!(symbol = %key, error = %e, "skipped");
                        Outcome::Skipped(e)
                    }
                },
            };
            (key.clone(), outcome)
        })
        .collect()
}
