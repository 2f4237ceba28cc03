// Ambre CLI - headless ledger reconciliation cycles

mod cycle;
mod exit_codes;
mod export;

use std::path::PathBuf;
use std::process::ExitCode;

use ambre_recon::model::LedgerField;
use clap::{Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "ambre")]
#[command(about = "Ledger snapshot diff and reconciliation views")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify keys of two ledger snapshots as new, updated or deleted
    #[command(after_help = "\
Exit codes:
  0  snapshots are identical
  1  at least one key is new, updated or deleted
  3  invalid input (duplicate or empty keys)
  5  malformed JSON

Examples:
  ambre diff old.json new.json
  ambre diff old.json new.json --json
  ambre diff old.json new.json --ignore label --output changes.json")]
    Diff {
        /// Previous snapshot (JSON array of ledger records)
        old: PathBuf,

        /// Current snapshot (JSON array of ledger records)
        new: PathBuf,

        /// Ledger field to leave out of the comparison (repeatable)
        #[arg(long, value_parser = cycle::parse_field)]
        ignore: Vec<LedgerField>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run one reconciliation cycle from a TOML config file
    #[command(after_help = "\
Examples:
  ambre run cycle.toml
  ambre run cycle.toml --json
  ambre run cycle.toml --output result.json --csv views.csv")]
    Run {
        /// Path to the cycle config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write merged views as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Validate a cycle config without running
    #[command(after_help = "\
Examples:
  ambre validate cycle.toml")]
    Validate {
        /// Path to the cycle config file
        config: PathBuf,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

/// Route `log` records and tracing events to stderr, filtered by `AMBRE_LOG`.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("AMBRE_LOG")
        .unwrap_or_else(|_| "warn".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Diff { old, new, ignore, json, output } => {
            cycle::cmd_diff(old, new, ignore, json, output)
        }
        Commands::Run { config, json, output, csv } => cycle::cmd_run(config, json, output, csv),
        Commands::Validate { config } => cycle::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
