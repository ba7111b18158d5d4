//! Run summaries and run fingerprints.

use chartscan_core::domain::SymbolKey;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RunId;

/// Deterministic BLAKE3 fingerprint of a job, its parameters and a country
/// scope. Scope order and duplicates do not matter.
pub fn fingerprint<P: Serialize + ?Sized>(job: &str, params: &P, countries: &[String]) -> RunId {
    let mut scope: Vec<&str> = countries.iter().map(String::as_str).collect();
    scope.sort_unstable();
    scope.dedup();
    // Plain data: serialization cannot fail.
    let json = serde_json::to_string(&(job, params, scope)).unwrap_or_default();
    blake3::hash(json.as_bytes()).to_hex().to_string()
}

/// Counts of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub job: String,
    pub countries: Vec<String>,
    /// Candidates analysed.
    pub scanned: usize,
    pub qualified: usize,
    pub added: usize,
    /// Rows whose stage changed.
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Candidates with too little history to judge.
    pub skipped: usize,
    /// Candidates whose series could not be fetched; their rows are untouched.
    pub failed: usize,
    pub failed_symbols: Vec<SymbolKey>,
}

impl RunSummary {
    pub fn new(job: &str, run_id: RunId, countries: &[String]) -> Self {
        Self {
            run_id,
            job: job.to_string(),
            countries: countries.to_vec(),
            ..Self::default()
        }
    }

    pub fn log(&self) {
        info!(
            job = %self.job,
            run_id = %self.run_id,
            scanned = self.scanned,
            qualified = self.qualified,
            added = self.added,
            updated = self.updated,
            removed = self.removed,
            unchanged = self.unchanged,
            skipped = self.skipped,
            failed = self.failed,
            "run complete"
        );
    }
}
