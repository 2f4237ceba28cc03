use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// One imported Ambre ledger line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Stable business identifier (account + reference + date composite upstream).
    pub key: String,
    pub account_id: String,
    pub reference: Option<String>,
    pub label: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub value_date: NaiveDate,
    pub operation_date: Option<NaiveDate>,
    pub counterparty: Option<String>,
    pub counterparty_account: Option<String>,
    /// Guarantee reference as printed on the ledger line. Informational only:
    /// reference data is joined through `ReconciliationState::guarantee_id`.
    pub guarantee_ref: Option<String>,
    pub last_modified_by: Option<String>,
    pub last_modified_at: Option<NaiveDateTime>,
}

/// Full set of ledger records for one import cycle, ordered by key.
pub type Snapshot = BTreeMap<String, LedgerRecord>;

/// Comparable ledger fields. Audit fields (`last_modified_by`, `last_modified_at`)
/// are not listed and never take part in change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerField {
    AccountId,
    Reference,
    Label,
    Amount,
    Currency,
    ValueDate,
    OperationDate,
    Counterparty,
    CounterpartyAccount,
    GuaranteeRef,
}

impl LedgerField {
    pub const ALL: [LedgerField; 10] = [
        Self::AccountId,
        Self::Reference,
        Self::Label,
        Self::Amount,
        Self::Currency,
        Self::ValueDate,
        Self::OperationDate,
        Self::Counterparty,
        Self::CounterpartyAccount,
        Self::GuaranteeRef,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountId => "account_id",
            Self::Reference => "reference",
            Self::Label => "label",
            Self::Amount => "amount",
            Self::Currency => "currency",
            Self::ValueDate => "value_date",
            Self::OperationDate => "operation_date",
            Self::Counterparty => "counterparty",
            Self::CounterpartyAccount => "counterparty_account",
            Self::GuaranteeRef => "guarantee_ref",
        }
    }
}

impl std::fmt::Display for LedgerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerRecord {
    /// Value equality on one field. `Decimal` equality is exact (scale-insensitive,
    /// so `100` equals `100.00`), options compare `None == None`.
    pub fn field_eq(&self, other: &LedgerRecord, field: LedgerField) -> bool {
        match field {
            LedgerField::AccountId => self.account_id == other.account_id,
            LedgerField::Reference => self.reference == other.reference,
            LedgerField::Label => self.label == other.label,
            LedgerField::Amount => self.amount == other.amount,
            LedgerField::Currency => self.currency == other.currency,
            LedgerField::ValueDate => self.value_date == other.value_date,
            LedgerField::OperationDate => self.operation_date == other.operation_date,
            LedgerField::Counterparty => self.counterparty == other.counterparty,
            LedgerField::CounterpartyAccount => {
                self.counterparty_account == other.counterparty_account
            }
            LedgerField::GuaranteeRef => self.guarantee_ref == other.guarantee_ref,
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation state
// ---------------------------------------------------------------------------

/// Operator-maintained metadata for one ledger key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationState {
    pub key: String,
    pub guarantee_id: Option<String>,
    pub invoice_id: Option<String>,
    pub commission_id: Option<String>,
    pub action: Option<i32>,
    pub comment: Option<String>,
    pub internal_ref: Option<String>,
    pub first_claim_date: Option<NaiveDate>,
    pub last_claim_date: Option<NaiveDate>,
    #[serde(default)]
    pub to_remind: bool,
    pub to_remind_date: Option<NaiveDate>,
    #[serde(default)]
    pub acknowledged: bool,
    pub swift_code: Option<String>,
    pub payment_reference: Option<String>,
    pub kpi: Option<i32>,
    pub incident_type: Option<i32>,
    pub assignee: Option<String>,
    /// Tri-state: unset, false, true. Stored as given.
    pub risky_item: Option<bool>,
    pub reason_non_risky: Option<i32>,
    pub last_modified_by: Option<String>,
}

impl ReconciliationState {
    /// All fields at their defaults, for a ledger key nobody has annotated yet.
    pub fn unreconciled(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Self::default()
        }
    }

    /// Unset counts as not risky.
    pub fn is_risky_effective(&self) -> bool {
        self.risky_item == Some(true)
    }
}

// ---------------------------------------------------------------------------
// DWINGS reference data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalGuarantee {
    pub guarantee_id: String,
    pub status: Option<String>,
    pub guarantee_type: Option<String>,
    pub official_reference: Option<String>,
    pub outstanding_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub cancellation_date: Option<NaiveDate>,
    pub beneficiary_name: Option<String>,
    pub principal_name: Option<String>,
    pub booking_entity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalInvoice {
    pub invoice_id: String,
    pub status: Option<String>,
    pub business_case_reference: Option<String>,
    pub request_amount: Option<Decimal>,
    pub billing_amount: Option<Decimal>,
    pub billing_currency: Option<String>,
    pub request_date: Option<NaiveDate>,
    pub billing_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub sender_name: Option<String>,
    pub receiver_name: Option<String>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Transient per-refresh indicators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFlags {
    pub is_newly_added: bool,
    pub is_updated: bool,
    pub is_potential_duplicate: bool,
    /// Key was not part of the previously displayed view set.
    pub is_first_seen: bool,
    /// Owned by the presentation layer. The engine never sets it.
    pub is_highlighted: bool,
}

/// Denormalized projection of one ledger key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub ledger: LedgerRecord,
    pub reconciliation: ReconciliationState,
    /// False when no `ReconciliationState` existed and `reconciliation` holds defaults.
    pub is_reconciled: bool,
    pub guarantee: Option<ExternalGuarantee>,
    pub invoice: Option<ExternalInvoice>,
    pub is_risky_effective: bool,
    pub flags: ChangeFlags,
}

impl ViewRecord {
    pub fn key(&self) -> &str {
        &self.ledger.key
    }

    /// Guarantee id is set on the state but absent from reference data.
    pub fn has_unresolved_guarantee(&self) -> bool {
        self.reconciliation.guarantee_id.is_some() && self.guarantee.is_none()
    }

    pub fn has_unresolved_invoice(&self) -> bool {
        self.reconciliation.invoice_id.is_some() && self.invoice.is_none()
    }
}

// ---------------------------------------------------------------------------
// Change set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    New,
    Updated,
    Deleted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Updated => write!(f, "updated"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// Diff output. Each sequence is ordered by key; a key is in at most one.
/// `updated` carries the new version of a record, `deleted` the old one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub new: Vec<LedgerRecord>,
    pub updated: Vec<LedgerRecord>,
    pub deleted: Vec<LedgerRecord>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.updated.len() + self.deleted.len()
    }

    pub fn records(&self, kind: ChangeKind) -> &[LedgerRecord] {
        match kind {
            ChangeKind::New => &self.new,
            ChangeKind::Updated => &self.updated,
            ChangeKind::Deleted => &self.deleted,
        }
    }

    pub fn keys(&self, kind: ChangeKind) -> impl Iterator<Item = &str> {
        self.records(kind).iter().map(|r| r.key.as_str())
    }
}

/// Comparable fields that changed for one updated key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChanges {
    pub key: String,
    pub fields: Vec<LedgerField>,
}
