//! JSON loaders for cycle inputs. Each file holds a JSON array of records.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::diff::snapshot_from_records;
use crate::error::ReconError;
use crate::model::{ExternalGuarantee, ExternalInvoice, ReconciliationState, Snapshot};

pub fn read_file(path: &Path) -> Result<String, ReconError> {
    std::fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))
}

fn parse_array<T: DeserializeOwned>(source: &str, json: &str) -> Result<Vec<T>, ReconError> {
    serde_json::from_str(json).map_err(|e| ReconError::Json {
        source: source.into(),
        message: e.to_string(),
    })
}

/// Index items by `key_of`, rejecting empty and repeated keys.
fn index_by<T>(
    source: &str,
    items: Vec<T>,
    key_of: impl Fn(&T) -> &str,
) -> Result<HashMap<String, T>, ReconError> {
    let mut map = HashMap::with_capacity(items.len());
    let mut duplicates: BTreeMap<String, usize> = BTreeMap::new();

    for item in items {
        let key = key_of(&item).to_string();
        if key.trim().is_empty() {
            return Err(ReconError::EmptyKey { source: source.into() });
        }
        if map.contains_key(&key) {
            *duplicates.entry(key).or_insert(1) += 1;
            continue;
        }
        map.insert(key, item);
    }

    if let Some((key, count)) = duplicates.into_iter().next() {
        return Err(ReconError::DuplicateKey { source: source.into(), key, count });
    }
    Ok(map)
}

pub fn parse_snapshot(source: &str, json: &str) -> Result<Snapshot, ReconError> {
    snapshot_from_records(source, parse_array(source, json)?)
}

pub fn parse_states(
    source: &str,
    json: &str,
) -> Result<HashMap<String, ReconciliationState>, ReconError> {
    index_by(source, parse_array::<ReconciliationState>(source, json)?, |s| s.key.as_str())
}

pub fn parse_guarantees(
    source: &str,
    json: &str,
) -> Result<HashMap<String, ExternalGuarantee>, ReconError> {
    index_by(source, parse_array::<ExternalGuarantee>(source, json)?, |g| {
        g.guarantee_id.as_str()
    })
}

pub fn parse_invoices(
    source: &str,
    json: &str,
) -> Result<HashMap<String, ExternalInvoice>, ReconError> {
    index_by(source, parse_array::<ExternalInvoice>(source, json)?, |i| i.invoice_id.as_str())
}

pub fn parse_keys(source: &str, json: &str) -> Result<HashSet<String>, ReconError> {
    Ok(parse_array::<String>(source, json)?.into_iter().collect())
}
