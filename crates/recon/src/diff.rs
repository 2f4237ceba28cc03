// Snapshot diff for ledger imports.
// Pure functions: two snapshots in, New/Updated/Deleted classification out.
// No IO, no persistence.

use crate::config::{EngineConfig, ParallelConfig};
use crate::error::ReconError;
use crate::model::{ChangeKind, ChangeSet, FieldChanges, LedgerField, LedgerRecord, Snapshot};
use crate::partition::map_chunks;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Comparable fields excluded from change detection.
    pub ignore_fields: Vec<LedgerField>,
    pub parallel: ParallelConfig,
}

impl DiffOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            ignore_fields: config.diff.ignore_fields.clone(),
            parallel: config.parallel.clone(),
        }
    }

    fn compared_fields(&self) -> Vec<LedgerField> {
        LedgerField::ALL
            .iter()
            .copied()
            .filter(|f| !self.ignore_fields.contains(f))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Snapshot construction + validation
// ---------------------------------------------------------------------------

/// Index `records` by key. Fails on empty keys and on duplicate keys;
/// `source` names the input in error messages.
pub fn snapshot_from_records(
    source: &str,
    records: Vec<LedgerRecord>,
) -> Result<Snapshot, ReconError> {
    let mut snapshot = Snapshot::new();
    let mut duplicates: std::collections::BTreeMap<String, usize> = Default::default();

    for record in records {
        if record.key.trim().is_empty() {
            return Err(ReconError::EmptyKey { source: source.into() });
        }
        if snapshot.contains_key(&record.key) {
            *duplicates.entry(record.key.clone()).or_insert(1) += 1;
            continue;
        }
        snapshot.insert(record.key.clone(), record);
    }

    // Lowest duplicate key first so the error is reproducible.
    if let Some((key, count)) = duplicates.into_iter().next() {
        return Err(ReconError::DuplicateKey { source: source.into(), key, count });
    }

    Ok(snapshot)
}

/// Check the key invariants of an already-built snapshot.
pub fn validate_snapshot(source: &str, snapshot: &Snapshot) -> Result<(), ReconError> {
    for (map_key, record) in snapshot {
        if map_key.trim().is_empty() || record.key.trim().is_empty() {
            return Err(ReconError::EmptyKey { source: source.into() });
        }
        if *map_key != record.key {
            return Err(ReconError::KeyMismatch {
                source: source.into(),
                map_key: map_key.clone(),
                record_key: record.key.clone(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Core diff
// ---------------------------------------------------------------------------

/// Classify every key of `old` ∪ `new`, comparing all comparable fields.
pub fn diff(old: &Snapshot, new: &Snapshot) -> Result<ChangeSet, ReconError> {
    diff_with(old, new, &DiffOptions::default())
}

pub fn diff_with(
    old: &Snapshot,
    new: &Snapshot,
    options: &DiffOptions,
) -> Result<ChangeSet, ReconError> {
    validate_snapshot("old snapshot", old)?;
    validate_snapshot("new snapshot", new)?;

    let compare = options.compared_fields();

    // New-side keys: New or Updated. Chunks come back in key order.
    let new_records: Vec<&LedgerRecord> = new.values().collect();
    let classified: Vec<(ChangeKind, &LedgerRecord)> =
        map_chunks(&new_records, &options.parallel, |chunk| {
            chunk
                .iter()
                .filter_map(|record| match old.get(&record.key) {
                    None => Some((ChangeKind::New, *record)),
                    Some(prev) if !fields_equal(prev, record, &compare) => {
                        Some((ChangeKind::Updated, *record))
                    }
                    Some(_) => None,
                })
                .collect()
        });

    let mut change_set = ChangeSet::default();
    for (kind, record) in classified {
        if kind == ChangeKind::New {
            change_set.new.push(record.clone());
        } else {
            change_set.updated.push(record.clone());
        }
    }

    change_set.deleted = old
        .values()
        .filter(|record| !new.contains_key(&record.key))
        .cloned()
        .collect();

    log::debug!(
        "diff: {} old, {} new -> {} new, {} updated, {} deleted",
        old.len(),
        new.len(),
        change_set.new.len(),
        change_set.updated.len(),
        change_set.deleted.len(),
    );

    Ok(change_set)
}

// ---------------------------------------------------------------------------
// Field-level detail
// ---------------------------------------------------------------------------

/// Comparable fields that differ between two versions of a record.
pub fn changed_fields(
    prev: &LedgerRecord,
    next: &LedgerRecord,
    ignore: &[LedgerField],
) -> Vec<LedgerField> {
    LedgerField::ALL
        .iter()
        .copied()
        .filter(|f| !ignore.contains(f) && !prev.field_eq(next, *f))
        .collect()
}

/// Field-level detail for every updated key of `change_set`.
pub fn field_changes(
    old: &Snapshot,
    change_set: &ChangeSet,
    options: &DiffOptions,
) -> Vec<FieldChanges> {
    change_set
        .updated
        .iter()
        .filter_map(|next| {
            old.get(&next.key).map(|prev| FieldChanges {
                key: next.key.clone(),
                fields: changed_fields(prev, next, &options.ignore_fields),
            })
        })
        .collect()
}

fn fields_equal(prev: &LedgerRecord, next: &LedgerRecord, compare: &[LedgerField]) -> bool {
    compare.iter().all(|f| prev.field_eq(next, *f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn rec(key: &str, amount: &str) -> LedgerRecord {
        LedgerRecord {
            key: key.into(),
            account_id: "ACC-01".into(),
            reference: Some(format!("REF-{key}")),
            label: None,
            amount: amount.parse().unwrap(),
            currency: "EUR".into(),
            value_date: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            operation_date: None,
            counterparty: Some("ACME".into()),
            counterparty_account: None,
            guarantee_ref: None,
            last_modified_by: None,
            last_modified_at: None,
        }
    }

    fn snap(records: Vec<LedgerRecord>) -> Snapshot {
        snapshot_from_records("test", records).unwrap()
    }

    fn keys(records: &[LedgerRecord]) -> Vec<&str> {
        records.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn classifies_new_updated_deleted() {
        let old = snap(vec![rec("A", "100"), rec("B", "200")]);
        let new = snap(vec![rec("A", "100"), rec("B", "250"), rec("C", "300")]);
        let cs = diff(&old, &new).unwrap();
        assert_eq!(keys(&cs.new), vec!["C"]);
        assert_eq!(keys(&cs.updated), vec!["B"]);
        assert!(cs.deleted.is_empty());
        assert_eq!(cs.updated[0].amount, Decimal::new(250, 0));
    }

    #[test]
    fn same_snapshot_is_unchanged() {
        let s = snap(vec![rec("A", "1"), rec("B", "2")]);
        assert!(diff(&s, &s).unwrap().is_empty());
    }

    #[test]
    fn empty_sides() {
        let s = snap(vec![rec("B", "2"), rec("A", "1")]);
        let empty = Snapshot::new();

        let cs = diff(&empty, &s).unwrap();
        assert_eq!(keys(&cs.new), vec!["A", "B"]);
        assert!(cs.updated.is_empty() && cs.deleted.is_empty());

        let cs = diff(&s, &empty).unwrap();
        assert_eq!(keys(&cs.deleted), vec!["A", "B"]);
        assert!(cs.new.is_empty() && cs.updated.is_empty());
    }

    #[test]
    fn deleted_carries_old_version() {
        let old = snap(vec![rec("A", "10.50")]);
        let cs = diff(&old, &Snapshot::new()).unwrap();
        assert_eq!(cs.deleted[0], old["A"]);
    }

    #[test]
    fn audit_fields_do_not_count() {
        let old = snap(vec![rec("A", "100")]);
        let mut touched = rec("A", "100");
        touched.last_modified_by = Some("import-bot".into());
        touched.last_modified_at = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(6, 30, 0);
        let new = snap(vec![touched]);
        assert!(diff(&old, &new).unwrap().is_empty());
    }

    #[test]
    fn decimal_equality_is_by_value() {
        let old = snap(vec![rec("A", "100")]);
        let same = snap(vec![rec("A", "100.00")]);
        assert!(diff(&old, &same).unwrap().is_empty());

        let off_by_a_cent = snap(vec![rec("A", "100.01")]);
        assert_eq!(diff(&old, &off_by_a_cent).unwrap().updated.len(), 1);
    }

    #[test]
    fn null_to_value_is_an_update() {
        let old = snap(vec![rec("A", "1")]);
        let mut with_op_date = rec("A", "1");
        with_op_date.operation_date = NaiveDate::from_ymd_opt(2026, 10, 14);
        let cs = diff(&old, &snap(vec![with_op_date.clone()])).unwrap();
        assert_eq!(keys(&cs.updated), vec!["A"]);
        assert_eq!(
            changed_fields(&old["A"], &with_op_date, &[]),
            vec![LedgerField::OperationDate]
        );
    }

    #[test]
    fn ignored_fields_are_skipped() {
        let old = snap(vec![rec("A", "1")]);
        let mut relabeled = rec("A", "1");
        relabeled.label = Some("manual label".into());
        let new = snap(vec![relabeled]);

        assert_eq!(diff(&old, &new).unwrap().updated.len(), 1);

        let opts = DiffOptions { ignore_fields: vec![LedgerField::Label], ..Default::default() };
        assert!(diff_with(&old, &new, &opts).unwrap().is_empty());
    }

    #[test]
    fn field_changes_per_updated_key() {
        let old = snap(vec![rec("A", "1"), rec("B", "2")]);
        let mut b = rec("B", "3");
        b.currency = "USD".into();
        let new = snap(vec![rec("A", "1"), b]);
        let opts = DiffOptions::default();
        let cs = diff_with(&old, &new, &opts).unwrap();
        let changes = field_changes(&old, &cs, &opts);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].key, "B");
        assert_eq!(changes[0].fields, vec![LedgerField::Amount, LedgerField::Currency]);
    }

    #[test]
    fn empty_key_is_invalid_input() {
        let err = snapshot_from_records("new snapshot", vec![rec("  ", "1")]).unwrap_err();
        assert!(matches!(err, ReconError::EmptyKey { .. }));

        let mut bad = Snapshot::new();
        bad.insert(String::new(), rec("", "1"));
        let err = diff(&Snapshot::new(), &bad).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn mismatched_map_key_is_invalid_input() {
        let mut bad = Snapshot::new();
        bad.insert("A".into(), rec("B", "1"));
        let err = diff(&bad, &Snapshot::new()).unwrap_err();
        assert!(matches!(err, ReconError::KeyMismatch { .. }));
    }

    #[test]
    fn duplicate_keys_rejected_with_count() {
        let err = snapshot_from_records(
            "new snapshot",
            vec![rec("B", "1"), rec("A", "1"), rec("B", "2"), rec("B", "3"), rec("A", "4")],
        )
        .unwrap_err();
        match err {
            ReconError::DuplicateKey { key, count, .. } => {
                assert_eq!(key, "A");
                assert_eq!(count, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn partitioned_diff_matches_sequential() {
        let old = snap((0..500).map(|i| rec(&format!("K{i:04}"), "1")).collect());
        let new = snap(
            (100..700)
                .map(|i| rec(&format!("K{i:04}"), if i % 7 == 0 { "2" } else { "1" }))
                .collect(),
        );
        let sequential = diff(&old, &new).unwrap();
        let opts = DiffOptions {
            ignore_fields: vec![],
            parallel: ParallelConfig { workers: 4, min_chunk: 16 },
        };
        let partitioned = diff_with(&old, &new, &opts).unwrap();
        assert_eq!(sequential, partitioned);
        assert_eq!(sequential.new.len(), 200);
        assert_eq!(sequential.deleted.len(), 100);
    }
}
