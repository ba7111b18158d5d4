//! Trend-template screening job.

use std::collections::BTreeSet;

use chartscan_core::data::SeriesSource;
use chartscan_core::domain::SymbolKey;
use chartscan_core::patterns::TrendTemplate;
use tracing::{debug, info};

use crate::pipeline::{scan, Outcome, RunError};
use crate::store::{ScreenedStore, Upsert};
use crate::summary::{fingerprint, RunSummary};

pub const JOB: &str = "screen";

/// Screen every symbol the source lists for `countries` and reconcile the
/// screened universe: qualifying symbols are upserted, stored symbols that
/// no longer qualify are deleted. Rows of other countries are never read or
/// written; symbols whose fetch failed keep their stored state.
pub fn run_screening(
    source: &dyn SeriesSource,
    store: &dyn ScreenedStore,
    countries: &[String],
    template: &TrendTemplate,
) -> Result<RunSummary, RunError> {
    let mut summary = RunSummary::new(JOB, fingerprint(JOB, template, countries), countries);
    let candidates = source.list_symbols(countries)?;
    info!(source = source.name(), candidates = candidates.len(), "screening");

    let outcomes = scan(source, &candidates, |series| {
        let report = template.evaluate(series)?;
        Ok(report.qualifies.then_some(report))
    });
    summary.scanned = outcomes.len();

    let mut qualified: BTreeSet<SymbolKey> = BTreeSet::new();
    let mut untouchable: BTreeSet<SymbolKey> = BTreeSet::new();
    for (key, outcome) in outcomes {
        match outcome {
            Outcome::Qualified(_) => {
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

    for key in &qualified {
        match store.upsert_screened(key)? {
            Upsert::Inserted => {
                debug!(symbol = %key, "added to screened universe");
                summary.added += 1;
            }
            Upsert::Updated | Upsert::Unchanged => summary.unchanged += 1,
        }
    }

    for row in store.list_screened(countries)? {
        let key = row.key();
        if qualified.contains(&key) || untouchable.contains(&key) {
            continue;
        }
        if store.delete_screened(&key)? {
            debug!(symbol = %key, "removed from screened universe");
            summary.removed += 1;
        }
    }

    summary.log();
    Ok(summary)
}
