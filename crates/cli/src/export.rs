//! Flat CSV export of merged view records, one row per ledger key.

use std::io::Write;

use ambre_recon::ViewRecord;

const VIEWS_HEADER: &[&str] = &[
    "key",
    "account_id",
    "reference",
    "label",
    "amount",
    "currency",
    "value_date",
    "counterparty",
    "is_reconciled",
    "action",
    "comment",
    "assignee",
    "risky_effective",
    "guarantee_id",
    "guarantee_status",
    "invoice_id",
    "invoice_status",
    "newly_added",
    "updated",
    "potential_duplicate",
    "first_seen",
];

fn flag(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

pub fn write_views_csv(views: &[ViewRecord], writer: impl Write) -> Result<(), String> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(VIEWS_HEADER)
        .map_err(|e| format!("CSV write error: {e}"))?;

    for v in views {
        let l = &v.ledger;
        let r = &v.reconciliation;
        let amount = l.amount.to_string();
        let value_date = l.value_date.format("%Y-%m-%d").to_string();
        let action = r.action.map(|a| a.to_string()).unwrap_or_default();
        csv.write_record([
            l.key.as_str(),
            l.account_id.as_str(),
            l.reference.as_deref().unwrap_or(""),
            l.label.as_deref().unwrap_or(""),
            amount.as_str(),
            l.currency.as_str(),
            value_date.as_str(),
            l.counterparty.as_deref().unwrap_or(""),
            flag(v.is_reconciled),
            action.as_str(),
            r.comment.as_deref().unwrap_or(""),
            r.assignee.as_deref().unwrap_or(""),
            flag(v.is_risky_effective),
            r.guarantee_id.as_deref().unwrap_or(""),
            v.guarantee.as_ref().and_then(|g| g.status.as_deref()).unwrap_or(""),
            r.invoice_id.as_deref().unwrap_or(""),
            v.invoice.as_ref().and_then(|i| i.status.as_deref()).unwrap_or(""),
            flag(v.flags.is_newly_added),
            flag(v.flags.is_updated),
            flag(v.flags.is_potential_duplicate),
            flag(v.flags.is_first_seen),
        ])
        .map_err(|e| format!("CSV write error: {e}"))?;
    }

    csv.flush().map_err(|e| format!("CSV flush error: {e}"))?;
    Ok(())
}
