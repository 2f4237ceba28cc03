//! Per-refresh change flags over a merged view set.
//!
//! Everything here is recomputed from scratch on each call and never persisted.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::config::{DuplicateKeySpec, ParallelConfig};
use crate::model::{ChangeFlags, ChangeKind, ChangeSet, LedgerField, LedgerRecord, ViewRecord};
use crate::partition::map_chunks;

const KEY_SEPARATOR: char = '\u{1f}';
/// Stands in for an absent component so that `None` groups with `None` only.
const NULL_TOKEN: char = '\u{0}';

/// Duplicate-detection key for one ledger record. Components compare with
/// null-safe equality: two absent counterparties match, an absent one never
/// matches a present (even blank) one.
pub fn duplicate_key(record: &LedgerRecord, composite: &DuplicateKeySpec) -> String {
    let mut key = String::new();
    for (i, field) in composite.fields.iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        match field_text(record, *field) {
            Some(text) => key.push_str(&text),
            None => key.push(NULL_TOKEN),
        }
    }
    key
}

fn field_text(record: &LedgerRecord, field: LedgerField) -> Option<String> {
    let text = match field {
        LedgerField::AccountId => record.account_id.clone(),
        LedgerField::Reference => record.reference.clone()?,
        LedgerField::Label => record.label.clone()?,
        // Normalized so 100 and 100.00 group together.
        LedgerField::Amount => record.amount.normalize().to_string(),
        LedgerField::Currency => record.currency.clone(),
        LedgerField::ValueDate => record.value_date.to_string(),
        LedgerField::OperationDate => record.operation_date?.to_string(),
        LedgerField::Counterparty => record.counterparty.clone()?,
        LedgerField::CounterpartyAccount => record.counterparty_account.clone()?,
        LedgerField::GuaranteeRef => record.guarantee_ref.clone()?,
    };
    Some(text)
}

/// Annotate `views` using the configured duplicate composite.
pub fn annotate(
    views: &mut [ViewRecord],
    change_set: &ChangeSet,
    prior_view_keys: &HashSet<String>,
    duplicates: &DuplicateKeySpec,
) {
    annotate_with(views, change_set, prior_view_keys, duplicates, &ParallelConfig::default());
}

/// Same as [`annotate`], computing duplicate keys across workers when the view set is large.
pub fn annotate_with(
    views: &mut [ViewRecord],
    change_set: &ChangeSet,
    prior_view_keys: &HashSet<String>,
    duplicates: &DuplicateKeySpec,
    parallel: &ParallelConfig,
) {
    let dup_keys = map_chunks(views, parallel, |chunk| {
        chunk.iter().map(|view| Some(duplicate_key(&view.ledger, duplicates))).collect()
    });
    apply_flags(views, change_set, prior_view_keys, &dup_keys);
}

/// Annotate `views` with a caller-supplied duplicate-detection key.
pub fn annotate_by<K, F>(
    views: &mut [ViewRecord],
    change_set: &ChangeSet,
    prior_view_keys: &HashSet<String>,
    key_fn: F,
) where
    K: Eq + Hash,
    F: Fn(&ViewRecord) -> Option<K>,
{
    let dup_keys: Vec<Option<K>> = views.iter().map(&key_fn).collect();
    apply_flags(views, change_set, prior_view_keys, &dup_keys);
}

/// One counting pass over a hash map, so cost stays linear in the view count.
/// `is_highlighted` belongs to the presentation layer and is left as found.
fn apply_flags<K: Eq + Hash>(
    views: &mut [ViewRecord],
    change_set: &ChangeSet,
    prior_view_keys: &HashSet<String>,
    dup_keys: &[Option<K>],
) {
    let new_keys: HashSet<&str> = change_set.keys(ChangeKind::New).collect();
    let updated_keys: HashSet<&str> = change_set.keys(ChangeKind::Updated).collect();

    let mut counts: HashMap<&K, usize> = HashMap::with_capacity(dup_keys.len());
    for key in dup_keys.iter().flatten() {
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut duplicates = 0usize;
    for (view, dup_key) in views.iter_mut().zip(dup_keys) {
        let is_potential_duplicate =
            dup_key.as_ref().is_some_and(|k| counts.get(k).copied().unwrap_or(0) > 1);
        if is_potential_duplicate {
            duplicates += 1;
        }

        let key = view.ledger.key.as_str();
        let flags = ChangeFlags {
            is_newly_added: new_keys.contains(key),
            is_updated: updated_keys.contains(key),
            is_potential_duplicate,
            is_first_seen: !prior_view_keys.contains(key),
            is_highlighted: view.flags.is_highlighted,
        };
        view.flags = flags;
    }

    log::debug!("annotate: {} views, {duplicates} potential duplicates", views.len());
}
