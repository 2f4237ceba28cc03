//! View merge: ledger + reconciliation state + DWINGS reference data → `ViewRecord`.
//!
//! Missing reconciliation state yields default fields; missing reference data
//! leaves the external side empty. Neither fails the merge.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::BuildHasher;

use crate::config::ParallelConfig;
use crate::error::ReconError;
use crate::model::{
    ChangeFlags, ExternalGuarantee, ExternalInvoice, LedgerRecord, ReconciliationState, ViewRecord,
};
use crate::partition::map_chunks;

/// Zero-or-one lookup by identifier.
pub trait Lookup<T> {
    fn lookup(&self, id: &str) -> Option<&T>;
}

impl<T, S: BuildHasher> Lookup<T> for HashMap<String, T, S> {
    fn lookup(&self, id: &str) -> Option<&T> {
        self.get(id)
    }
}

impl<T> Lookup<T> for BTreeMap<String, T> {
    fn lookup(&self, id: &str) -> Option<&T> {
        self.get(id)
    }
}

/// Merge every ledger record into a view record, keeping input order.
pub fn build_view<S, G, I>(
    ledger: &[LedgerRecord],
    states: &S,
    guarantees: &G,
    invoices: &I,
) -> Result<Vec<ViewRecord>, ReconError>
where
    S: Lookup<ReconciliationState> + Sync,
    G: Lookup<ExternalGuarantee> + Sync,
    I: Lookup<ExternalInvoice> + Sync,
{
    build_view_with(ledger, states, guarantees, invoices, &ParallelConfig::default())
}

/// Same as [`build_view`], partitioning the ledger across workers when it is large.
pub fn build_view_with<S, G, I>(
    ledger: &[LedgerRecord],
    states: &S,
    guarantees: &G,
    invoices: &I,
    parallel: &ParallelConfig,
) -> Result<Vec<ViewRecord>, ReconError>
where
    S: Lookup<ReconciliationState> + Sync,
    G: Lookup<ExternalGuarantee> + Sync,
    I: Lookup<ExternalInvoice> + Sync,
{
    validate_ledger(ledger)?;
    validate_state_keys(ledger, states)?;

    let views = map_chunks(ledger, parallel, |chunk| {
        chunk
            .iter()
            .map(|record| merge_one(record, states, guarantees, invoices))
            .collect()
    });

    Ok(views)
}

/// Join one ledger record with whatever is linked to it.
pub fn merge_one<S, G, I>(
    record: &LedgerRecord,
    states: &S,
    guarantees: &G,
    invoices: &I,
) -> ViewRecord
where
    S: Lookup<ReconciliationState> + ?Sized,
    G: Lookup<ExternalGuarantee> + ?Sized,
    I: Lookup<ExternalInvoice> + ?Sized,
{
    let (reconciliation, is_reconciled) = match states.lookup(&record.key) {
        Some(state) => (state.clone(), true),
        None => (ReconciliationState::unreconciled(&record.key), false),
    };

    // Reference data is only reachable through the state's ids.
    let guarantee = reconciliation
        .guarantee_id
        .as_deref()
        .and_then(|id| guarantees.lookup(id))
        .cloned();
    let invoice = reconciliation
        .invoice_id
        .as_deref()
        .and_then(|id| invoices.lookup(id))
        .cloned();

    let is_risky_effective = reconciliation.is_risky_effective();

    ViewRecord {
        ledger: record.clone(),
        reconciliation,
        is_reconciled,
        guarantee,
        invoice,
        is_risky_effective,
        flags: ChangeFlags::default(),
    }
}

fn validate_ledger(ledger: &[LedgerRecord]) -> Result<(), ReconError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(ledger.len());
    let mut duplicate: Option<&str> = None;

    for record in ledger {
        if record.key.trim().is_empty() {
            return Err(ReconError::EmptyKey { source: "ledger".into() });
        }
        let key = record.key.as_str();
        if !seen.insert(key) && duplicate.map_or(true, |d| key < d) {
            duplicate = Some(key);
        }
    }

    if let Some(key) = duplicate {
        let count = ledger.iter().filter(|r| r.key == key).count();
        return Err(ReconError::DuplicateKey { source: "ledger".into(), key: key.into(), count });
    }

    Ok(())
}

/// A state must carry the key it is stored under.
fn validate_state_keys<S>(ledger: &[LedgerRecord], states: &S) -> Result<(), ReconError>
where
    S: Lookup<ReconciliationState> + ?Sized,
{
    for record in ledger {
        if let Some(state) = states.lookup(&record.key) {
            if state.key != record.key {
                return Err(ReconError::KeyMismatch {
                    source: "states".into(),
                    map_key: record.key.clone(),
                    record_key: state.key.clone(),
                });
            }
        }
    }
    Ok(())
}
