//! `ambre diff`, `ambre run`, `ambre validate`.

use std::path::{Path, PathBuf};

use ambre_recon::engine::{load_inputs, run};
use ambre_recon::load::{parse_snapshot, read_file};
use ambre_recon::model::LedgerField;
use ambre_recon::{diff_with, DiffOptions, EngineConfig, ReconError};

use crate::exit_codes::{exit_code_for, EXIT_DIFF_CHANGES, EXIT_ERROR, EXIT_USAGE};
use crate::export::write_views_csv;
use crate::CliError;

fn engine_err(err: ReconError) -> CliError {
    let hint = if err.is_invalid_input() {
        Some("every record needs a unique, non-empty key".to_string())
    } else {
        None
    };
    CliError { code: exit_code_for(&err), message: err.to_string(), hint }
}

fn io_err(msg: impl Into<String>) -> CliError {
    CliError { code: EXIT_ERROR, message: msg.into(), hint: None }
}

/// Parse a ledger field name as written in cycle configs (`value_date`, `amount`, ...).
pub fn parse_field(s: &str) -> Result<LedgerField, String> {
    LedgerField::ALL
        .iter()
        .copied()
        .find(|f| f.as_str() == s)
        .ok_or_else(|| {
            let names: Vec<&str> = LedgerField::ALL.iter().map(|f| f.as_str()).collect();
            format!("unknown field '{s}' (expected one of: {})", names.join(", "))
        })
}

/// Print `json` to stdout and/or write it to `output`.
fn emit_json(json: &str, json_output: bool, output: Option<&Path>) -> Result<(), CliError> {
    if let Some(path) = output {
        std::fs::write(path, json)
            .map_err(|e| io_err(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }
    if json_output {
        println!("{json}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

pub fn cmd_diff(
    old_path: PathBuf,
    new_path: PathBuf,
    ignore: Vec<LedgerField>,
    json_output: bool,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let old_name = old_path.display().to_string();
    let new_name = new_path.display().to_string();
    let old = parse_snapshot(&old_name, &read_file(&old_path).map_err(engine_err)?)
        .map_err(engine_err)?;
    let new = parse_snapshot(&new_name, &read_file(&new_path).map_err(engine_err)?)
        .map_err(engine_err)?;

    let options = DiffOptions { ignore_fields: ignore, ..DiffOptions::default() };
    let change_set = diff_with(&old, &new, &options).map_err(engine_err)?;

    let json = serde_json::to_string_pretty(&change_set)
        .map_err(|e| io_err(format!("JSON serialization error: {e}")))?;
    emit_json(&json, json_output, output.as_deref())?;

    eprintln!(
        "{} -> {}: {} new, {} updated, {} deleted",
        old_name,
        new_name,
        change_set.new.len(),
        change_set.updated.len(),
        change_set.deleted.len(),
    );

    if change_set.is_empty() {
        Ok(())
    } else {
        // Summary already printed; no extra error line.
        Err(CliError { code: EXIT_DIFF_CHANGES, message: String::new(), hint: None })
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn load_config(config_path: &Path) -> Result<EngineConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| io_err(format!("cannot read config: {e}")))?;
    EngineConfig::from_toml(&config_str).map_err(engine_err)
}

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output: Option<PathBuf>,
    csv_output: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let files = config.inputs.as_ref().ok_or_else(|| CliError {
        code: EXIT_USAGE,
        message: format!("{}: no [inputs] section", config_path.display()),
        hint: Some("add [inputs] with at least `old` and `new` snapshot files".to_string()),
    })?;

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    log::debug!("loading cycle inputs from {}", base_dir.display());
    let input = load_inputs(files, base_dir).map_err(engine_err)?;
    let result = run(&config, &input).map_err(engine_err)?;

    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| io_err(format!("JSON serialization error: {e}")))?;
    emit_json(&json, json_output, output.as_deref())?;

    if let Some(path) = csv_output {
        let file = std::fs::File::create(&path)
            .map_err(|e| io_err(format!("cannot create {}: {e}", path.display())))?;
        write_views_csv(&result.views, file).map_err(io_err)?;
        eprintln!("wrote {}", path.display());
    }

    let s = &result.summary;
    eprintln!(
        "{}: {} views ({} reconciled, {} risky) | {} new, {} updated, {} deleted | {} potential duplicates",
        result.meta.config_name,
        s.views,
        s.reconciled,
        s.risky,
        s.added,
        s.updated,
        s.deleted,
        s.potential_duplicates,
    );
    if !result.links.is_clean() {
        eprintln!(
            "unresolved links: {} guarantee(s), {} invoice(s)",
            s.unresolved_guarantees, s.unresolved_invoices,
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let fields: Vec<&str> = config.duplicates.fields.iter().map(|f| f.as_str()).collect();
    eprintln!(
        "valid: cycle '{}', duplicate key [{}], {} worker(s){}",
        config.name,
        fields.join(", "),
        config.parallel.workers,
        if config.inputs.is_some() { "" } else { ", no [inputs]" },
    );
    Ok(())
}
