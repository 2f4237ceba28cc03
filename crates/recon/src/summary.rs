use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{ChangeSet, Snapshot, ViewRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleSummary {
    pub old_records: usize,
    pub new_records: usize,
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub views: usize,
    pub reconciled: usize,
    pub risky: usize,
    pub potential_duplicates: usize,
    pub unresolved_guarantees: usize,
    pub unresolved_invoices: usize,
}

/// Reference ids carried by reconciliation states but missing from DWINGS data.
/// A data-quality signal, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkReport {
    pub unresolved_guarantees: BTreeSet<String>,
    pub unresolved_invoices: BTreeSet<String>,
}

impl LinkReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved_guarantees.is_empty() && self.unresolved_invoices.is_empty()
    }
}

/// Collect unresolved links from a merged view set.
pub fn link_report(views: &[ViewRecord]) -> LinkReport {
    let mut report = LinkReport::default();
    for view in views {
        if view.has_unresolved_guarantee() {
            if let Some(id) = &view.reconciliation.guarantee_id {
                report.unresolved_guarantees.insert(id.clone());
            }
        }
        if view.has_unresolved_invoice() {
            if let Some(id) = &view.reconciliation.invoice_id {
                report.unresolved_invoices.insert(id.clone());
            }
        }
    }
    report
}

/// Compute cycle counts. `unchanged` is the share of the new snapshot that is
/// neither new nor updated.
pub fn compute_summary(
    old: &Snapshot,
    new: &Snapshot,
    change_set: &ChangeSet,
    views: &[ViewRecord],
    links: &LinkReport,
) -> CycleSummary {
    let mut reconciled = 0;
    let mut risky = 0;
    let mut potential_duplicates = 0;

    for v in views {
        if v.is_reconciled {
            reconciled += 1;
        }
        if v.is_risky_effective {
            risky += 1;
        }
        if v.flags.is_potential_duplicate {
            potential_duplicates += 1;
        }
    }

    CycleSummary {
        old_records: old.len(),
        new_records: new.len(),
        added: change_set.new.len(),
        updated: change_set.updated.len(),
        deleted: change_set.deleted.len(),
        unchanged: new
            .len()
            .saturating_sub(change_set.new.len() + change_set.updated.len()),
        views: views.len(),
        reconciled,
        risky,
        potential_duplicates,
        unresolved_guarantees: links.unresolved_guarantees.len(),
        unresolved_invoices: links.unresolved_invoices.len(),
    }
}
