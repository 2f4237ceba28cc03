use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Serialize;

use crate::config::{EngineConfig, InputFiles};
use crate::diff::{diff_with, field_changes, DiffOptions};
use crate::error::ReconError;
use crate::flags::annotate_with;
use crate::load;
use crate::model::{
    ChangeSet, ExternalGuarantee, ExternalInvoice, FieldChanges, LedgerRecord,
    ReconciliationState, Snapshot, ViewRecord,
};
use crate::summary::{compute_summary, link_report, CycleSummary, LinkReport};
use crate::view::build_view_with;

/// Pre-loaded inputs for one reconciliation cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleInput {
    pub old: Snapshot,
    pub new: Snapshot,
    pub states: HashMap<String, ReconciliationState>,
    pub guarantees: HashMap<String, ExternalGuarantee>,
    pub invoices: HashMap<String, ExternalInvoice>,
    /// Keys displayed by the previous refresh. `None` means "the old snapshot's keys".
    pub prior_view_keys: Option<HashSet<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleResult {
    pub meta: CycleMeta,
    pub summary: CycleSummary,
    pub change_set: ChangeSet,
    pub field_changes: Vec<FieldChanges>,
    pub links: LinkReport,
    pub views: Vec<ViewRecord>,
}

/// Run one cycle: diff, merge the new snapshot into views, annotate, summarize.
pub fn run(config: &EngineConfig, input: &CycleInput) -> Result<CycleResult, ReconError> {
    let options = DiffOptions::from_config(config);
    let change_set = diff_with(&input.old, &input.new, &options)?;
    let changes = field_changes(&input.old, &change_set, &options);

    let ledger: Vec<LedgerRecord> = input.new.values().cloned().collect();
    let mut views = build_view_with(
        &ledger,
        &input.states,
        &input.guarantees,
        &input.invoices,
        &config.parallel,
    )?;

    let fallback_keys;
    let prior_view_keys = match &input.prior_view_keys {
        Some(keys) => keys,
        None => {
            fallback_keys = input.old.keys().cloned().collect::<HashSet<String>>();
            &fallback_keys
        }
    };
    annotate_with(
        &mut views,
        &change_set,
        prior_view_keys,
        &config.duplicates,
        &config.parallel,
    );

    let links = link_report(&views);
    if !links.is_clean() {
        log::warn!(
            "{} guarantee id(s) and {} invoice id(s) not found in reference data",
            links.unresolved_guarantees.len(),
            links.unresolved_invoices.len(),
        );
    }

    let summary = compute_summary(&input.old, &input.new, &change_set, &views, &links);
    log::info!(
        "cycle '{}': {} new, {} updated, {} deleted, {} unchanged; {} potential duplicates",
        config.name,
        summary.added,
        summary.updated,
        summary.deleted,
        summary.unchanged,
        summary.potential_duplicates,
    );

    Ok(CycleResult {
        meta: CycleMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        change_set,
        field_changes: changes,
        links,
        views,
    })
}

/// Load every input file named by `files`, resolving paths against `base_dir`.
/// Optional inputs that are not configured load as empty.
pub fn load_inputs(files: &InputFiles, base_dir: &Path) -> Result<CycleInput, ReconError> {
    let read = |name: &str| load::read_file(&base_dir.join(name));

    let old = load::parse_snapshot(&files.old, &read(&files.old)?)?;
    let new = load::parse_snapshot(&files.new, &read(&files.new)?)?;

    let states = match &files.states {
        Some(name) => load::parse_states(name, &read(name)?)?,
        None => HashMap::new(),
    };
    let guarantees = match &files.guarantees {
        Some(name) => load::parse_guarantees(name, &read(name)?)?,
        None => HashMap::new(),
    };
    let invoices = match &files.invoices {
        Some(name) => load::parse_invoices(name, &read(name)?)?,
        None => HashMap::new(),
    };
    let prior_view_keys = match &files.prior_view_keys {
        Some(name) => Some(load::parse_keys(name, &read(name)?)?),
        None => None,
    };

    log::debug!(
        "loaded {} old / {} new records, {} states, {} guarantees, {} invoices",
        old.len(),
        new.len(),
        states.len(),
        guarantees.len(),
        invoices.len(),
    );

    Ok(CycleInput { old, new, states, guarantees, invoices, prior_view_keys })
}
