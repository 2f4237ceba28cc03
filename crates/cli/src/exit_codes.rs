//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal / diff | General error, or "snapshots differ"     |
//! | 2       | Universal        | CLI usage error (bad args, bad config)   |
//! | 3-9     | input            | Snapshot and reference-data problems     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `exit_code_for`

use ambre_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure (unreadable file, write failure).
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid cycle config.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Diff
// =============================================================================

/// `ambre diff` found at least one New, Updated or Deleted key.
/// Like `diff(1)`, exit 1 means "snapshots differ."
pub const EXIT_DIFF_CHANGES: u8 = 1;

// =============================================================================
// Input (3-9)
// =============================================================================

/// Invalid input: duplicate keys, empty keys, or a map key that disagrees
/// with its record's key.
pub const EXIT_INVALID_INPUT: u8 = 3;

/// Input file is not valid JSON for its record type.
pub const EXIT_PARSE: u8 = 5;

/// Map an engine error to its exit code.
pub fn exit_code_for(err: &ReconError) -> u8 {
    match err {
        e if e.is_invalid_input() => EXIT_INVALID_INPUT,
        ReconError::Json { .. } => EXIT_PARSE,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_USAGE,
        _ => EXIT_ERROR,
    }
}
