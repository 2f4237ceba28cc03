use serde::Deserialize;

use crate::error::ReconError;
use crate::model::LedgerField;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub duplicates: DuplicateKeySpec,
    #[serde(default)]
    pub parallel: ParallelConfig,
    #[serde(default)]
    pub inputs: Option<InputFiles>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            diff: DiffConfig::default(),
            duplicates: DuplicateKeySpec::default(),
            parallel: ParallelConfig::default(),
            inputs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiffConfig {
    /// Comparable fields to leave out of change detection, on top of the audit fields.
    #[serde(default)]
    pub ignore_fields: Vec<LedgerField>,
}

// ---------------------------------------------------------------------------
// Duplicate detection
// ---------------------------------------------------------------------------

/// Composite of ledger fields that makes two distinct keys "the same movement".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DuplicateKeySpec {
    #[serde(default = "default_duplicate_fields")]
    pub fields: Vec<LedgerField>,
}

impl Default for DuplicateKeySpec {
    fn default() -> Self {
        Self {
            fields: default_duplicate_fields(),
        }
    }
}

fn default_duplicate_fields() -> Vec<LedgerField> {
    vec![
        LedgerField::Amount,
        LedgerField::Currency,
        LedgerField::Counterparty,
        LedgerField::ValueDate,
    ]
}

// ---------------------------------------------------------------------------
// Parallelism
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ParallelConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Below `workers * min_chunk` records everything runs on the calling thread.
    #[serde(default = "default_min_chunk")]
    pub min_chunk: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            min_chunk: default_min_chunk(),
        }
    }
}

fn default_workers() -> usize {
    1
}

fn default_min_chunk() -> usize {
    4096
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// JSON files for one cycle, relative to the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct InputFiles {
    pub old: String,
    pub new: String,
    #[serde(default)]
    pub states: Option<String>,
    #[serde(default)]
    pub guarantees: Option<String>,
    #[serde(default)]
    pub invoices: Option<String>,
    /// Keys shown by the previous refresh. Defaults to the old snapshot's keys.
    #[serde(default)]
    pub prior_view_keys: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        if self.duplicates.fields.is_empty() {
            return Err(ReconError::ConfigValidation(
                "duplicates.fields must list at least one field".into(),
            ));
        }

        let mut seen = Vec::with_capacity(self.duplicates.fields.len());
        for field in &self.duplicates.fields {
            if seen.contains(field) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicates.fields lists '{field}' more than once"
                )));
            }
            seen.push(*field);
        }

        if self.diff.ignore_fields.len() >= LedgerField::ALL.len()
            && LedgerField::ALL.iter().all(|f| self.diff.ignore_fields.contains(f))
        {
            return Err(ReconError::ConfigValidation(
                "diff.ignore_fields excludes every comparable field".into(),
            ));
        }

        if self.parallel.workers == 0 {
            return Err(ReconError::ConfigValidation("parallel.workers must be at least 1".into()));
        }
        if self.parallel.min_chunk == 0 {
            return Err(ReconError::ConfigValidation(
                "parallel.min_chunk must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
