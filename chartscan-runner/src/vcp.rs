//! VCP detection job over the screened universe.

use std::collections::BTreeSet;

use chartscan_core::data::SeriesSource;
use chartscan_core::domain::SymbolKey;
use chartscan_core::patterns::VcpStrategy;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::pipeline::{scan, Outcome, RunError};
use crate::store::{ScreenedStore, Upsert, VcpStore};
use crate::summary::{fingerprint, RunSummary};

pub const JOB: &str = "vcp";

/// Analyse the screened symbols of `countries` and reconcile the VCP table.
///
/// New patterns are inserted with `today` as their detection date, stage
/// changes are updated (and re-dated), and stored rows of the scope that no
/// longer show a pattern, or are no longer screened, are deleted.
pub fn run_vcp_detection(
    source: &dyn SeriesSource,
    screened: &dyn ScreenedStore,
    vcp: &dyn VcpStore,
    countries: &[String],
    strategy: &VcpStrategy,
    today: NaiveDate,
) -> Result<RunSummary, RunError> {
    let mut summary = RunSummary::new(JOB, fingerprint(JOB, strategy, countries), countries);
    let candidates: Vec<SymbolKey> = screened
        .list_screened(countries)?
        .iter()
        .map(|row| row.key())
        .collect();
    info!(strategy = strategy.name(), candidates = candidates.len(), "detecting vcp");

    let outcomes = scan(source, &candidates, |series| strategy.analyze(series));
    summary.scanned = outcomes.len();

    let mut qualified: BTreeSet<SymbolKey> = BTreeSet::new();
    let mut untouchable: BTreeSet<SymbolKey> = BTreeSet::new();
    for (key, outcome) in outcomes {
        match outcome {
            Outcome::Qualified(signal) => {
                match vcp.upsert_vcp(&key, signal.stage, today)? {
                    Upsert::Inserted => summary.added += 1,
                    Upsert::Updated => summary.updated += 1,
                    Upsert::Unchanged => summary.unchanged += 1,
                }
                debug!(symbol = %key, stage = %signal.stage, "vcp detected");
                qualified.insert(key);
            }
            Outcome::NotQualified => {}
            Outcome::Skipped(_) => summary.skipped += 1,
            Outcome::Failed(_) => {
                summary.failed += 1;
                summary.failed_symbols.push(key.clone());
                untouchable.insert(key);
            }
        }
    }
    summary.qualified = qualified.len();

    for row in vcp.list_vcp(countries)? {
        let key = row.key();
        if qualified.contains(&key) || untouchable.contains(&key) {
            continue;
        }
        if vcp.delete_vcp(&key)? {
            debug!(symbol = %key, "vcp removed");
            summary.removed += 1;
        }
    }

    summary.log();
    Ok(summary)
}
