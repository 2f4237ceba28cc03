//! `ambre-recon`: ledger snapshot diffing and reconciliation view merge.
//!
//! Pure engine crate: receives pre-loaded snapshots, states and DWINGS
//! reference data, returns change sets and annotated view records.
//! The only IO is the JSON loading in [`load`] and [`engine::load_inputs`].

pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod flags;
pub mod load;
pub mod model;
pub mod partition;
pub mod summary;
pub mod view;

pub use config::{DuplicateKeySpec, EngineConfig};
pub use diff::{diff, diff_with, DiffOptions};
pub use engine::{run, CycleInput, CycleResult};
pub use error::ReconError;
pub use flags::{annotate, annotate_by, annotate_with};
pub use model::{
    ChangeFlags, ChangeKind, ChangeSet, ExternalGuarantee, ExternalInvoice, LedgerField,
    LedgerRecord, ReconciliationState, Snapshot, ViewRecord,
};
pub use view::{build_view, build_view_with, Lookup};
