use std::collections::HashSet;
use std::path::PathBuf;

use ambre_recon::engine::{load_inputs, run, CycleResult};
use ambre_recon::model::{LedgerField, ViewRecord};
use ambre_recon::{EngineConfig, ReconError};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_config() -> EngineConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("cycle.toml")).unwrap();
    EngineConfig::from_toml(&toml).unwrap()
}

fn run_fixture_cycle() -> CycleResult {
    let config = load_config();
    let files = config.inputs.as_ref().expect("cycle.toml declares [inputs]");
    let input = load_inputs(files, &fixtures_dir()).unwrap();
    run(&config, &input).unwrap()
}

fn view<'a>(result: &'a CycleResult, key: &str) -> &'a ViewRecord {
    result
        .views
        .iter()
        .find(|v| v.key() == key)
        .unwrap_or_else(|| panic!("no view for {key}"))
}

// -------------------------------------------------------------------------
// Diff
// -------------------------------------------------------------------------

#[test]
fn cycle_classifies_changes() {
    let result = run_fixture_cycle();

    let keys = |records: &[ambre_recon::LedgerRecord]| -> Vec<String> {
        records.iter().map(|r| r.key.clone()).collect()
    };
    assert_eq!(keys(&result.change_set.new), vec!["A5", "A6", "A7"]);
    assert_eq!(keys(&result.change_set.updated), vec!["A2", "A4"]);
    assert_eq!(keys(&result.change_set.deleted), vec!["A3"]);

    assert_eq!(result.summary.old_records, 4);
    assert_eq!(result.summary.new_records, 6);
    assert_eq!(result.summary.unchanged, 1);
}

#[test]
fn rescaled_amount_and_audit_fields_are_not_updates() {
    let result = run_fixture_cycle();
    // A1: 100.00 -> 100, different last_modified_*: still unchanged.
    assert!(!result.change_set.updated.iter().any(|r| r.key == "A1"));
    let a1 = view(&result, "A1");
    assert!(!a1.flags.is_updated && !a1.flags.is_newly_added);
}

#[test]
fn field_changes_name_the_differing_fields() {
    let result = run_fixture_cycle();
    let detail: Vec<(&str, &[LedgerField])> = result
        .field_changes
        .iter()
        .map(|c| (c.key.as_str(), c.fields.as_slice()))
        .collect();
    assert_eq!(
        detail,
        vec![("A2", &[LedgerField::Amount][..]), ("A4", &[LedgerField::Label][..])]
    );
}

#[test]
fn deleted_records_carry_their_last_known_values() {
    let result = run_fixture_cycle();
    let a3 = &result.change_set.deleted[0];
    assert_eq!(a3.currency, "USD");
    assert_eq!(a3.counterparty.as_deref(), Some("Initech"));
    // Deleted keys are not part of the view.
    assert!(result.views.iter().all(|v| v.key() != "A3"));
}

// -------------------------------------------------------------------------
// View merge
// -------------------------------------------------------------------------

#[test]
fn views_cover_new_snapshot_in_key_order() {
    let result = run_fixture_cycle();
    let keys: Vec<&str> = result.views.iter().map(|v| v.key()).collect();
    assert_eq!(keys, vec!["A1", "A2", "A4", "A5", "A6", "A7"]);
    assert_eq!(result.summary.views, 6);
    assert_eq!(result.summary.reconciled, 3);
}

#[test]
fn reference_data_linked_through_state() {
    let result = run_fixture_cycle();
    let a1 = view(&result, "A1");
    assert!(a1.is_reconciled);
    assert!(a1.is_risky_effective);
    assert_eq!(a1.reconciliation.comment.as_deref(), Some("paid by wire"));
    assert_eq!(a1.guarantee.as_ref().map(|g| g.guarantee_id.as_str()), Some("G-1001"));
    assert_eq!(a1.invoice.as_ref().and_then(|i| i.status.as_deref()), Some("PAID"));

    let a4 = view(&result, "A4");
    assert!(!a4.is_reconciled);
    assert!(a4.guarantee.is_none() && a4.invoice.is_none());
}

#[test]
fn unresolved_guarantee_reported_not_fatal() {
    let result = run_fixture_cycle();
    let a2 = view(&result, "A2");
    assert!(a2.guarantee.is_none());
    assert!(a2.has_unresolved_guarantee());
    assert!(a2.reconciliation.to_remind);

    let ids: Vec<&str> = result.links.unresolved_guarantees.iter().map(|s| s.as_str()).collect();
    assert_eq!(ids, vec!["G-9999"]);
    assert!(result.links.unresolved_invoices.is_empty());
}

#[test]
fn explicit_false_risk_stays_false() {
    let result = run_fixture_cycle();
    let a5 = view(&result, "A5");
    assert_eq!(a5.reconciliation.risky_item, Some(false));
    assert!(!a5.is_risky_effective);
    assert_eq!(result.summary.risky, 1);
}

// -------------------------------------------------------------------------
// Flags
// -------------------------------------------------------------------------

#[test]
fn duplicates_flag_both_members() {
    let result = run_fixture_cycle();
    let dups: Vec<&str> = result
        .views
        .iter()
        .filter(|v| v.flags.is_potential_duplicate)
        .map(|v| v.key())
        .collect();
    // A6 and A7 have no counterparty: they pair with each other, not with A1/A5.
    assert_eq!(dups, vec!["A1", "A5", "A6", "A7"]);
    assert_eq!(result.summary.potential_duplicates, 4);
}

#[test]
fn first_seen_defaults_to_old_snapshot_keys() {
    let result = run_fixture_cycle();
    let first_seen: Vec<&str> =
        result.views.iter().filter(|v| v.flags.is_first_seen).map(|v| v.key()).collect();
    assert_eq!(first_seen, vec!["A5", "A6", "A7"]);
    assert!(result.views.iter().all(|v| !v.flags.is_highlighted));
}

#[test]
fn prior_view_keys_file_overrides_default() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["old.json", "new.json", "states.json", "guarantees.json", "invoices.json"] {
        std::fs::copy(fixtures_dir().join(name), dir.path().join(name)).unwrap();
    }
    std::fs::write(dir.path().join("shown.json"), r#"["A1", "A2", "A4", "A5"]"#).unwrap();

    let mut config = load_config();
    if let Some(files) = config.inputs.as_mut() {
        files.prior_view_keys = Some("shown.json".into());
    }
    let files = config.inputs.as_ref().unwrap();
    let input = load_inputs(files, dir.path()).unwrap();
    assert_eq!(input.prior_view_keys.as_ref().map(HashSet::len), Some(4));

    let result = run(&config, &input).unwrap();
    let a5 = view(&result, "A5");
    assert!(a5.flags.is_newly_added);
    assert!(!a5.flags.is_first_seen);
    assert!(view(&result, "A6").flags.is_first_seen);
}

// -------------------------------------------------------------------------
// Errors
// -------------------------------------------------------------------------

#[test]
fn duplicate_snapshot_key_is_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let dup = r#"[
        {"key": "K", "account_id": "A", "amount": "1", "currency": "EUR", "value_date": "2026-10-01"},
        {"key": "K", "account_id": "A", "amount": "2", "currency": "EUR", "value_date": "2026-10-02"}
    ]"#;
    std::fs::write(dir.path().join("old.json"), "[]").unwrap();
    std::fs::write(dir.path().join("new.json"), dup).unwrap();

    let config = EngineConfig::from_toml(
        r#"
name = "dup"
[inputs]
old = "old.json"
new = "new.json"
"#,
    )
    .unwrap();
    let err = load_inputs(config.inputs.as_ref().unwrap(), dir.path()).unwrap_err();
    assert!(err.is_invalid_input());
    match err {
        ReconError::DuplicateKey { key, count, .. } => {
            assert_eq!(key, "K");
            assert_eq!(count, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn result_serializes_to_json() {
    let result = run_fixture_cycle();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["meta"]["config_name"], "October close");
    assert_eq!(json["summary"]["added"], 3);
    assert_eq!(json["field_changes"][0]["fields"][0], "amount");
    assert_eq!(json["views"][0]["flags"]["is_potential_duplicate"], true);
}
