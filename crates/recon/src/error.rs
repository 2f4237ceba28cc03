use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// A snapshot or ledger slice contains an empty (or whitespace-only) key.
    EmptyKey { source: String },
    /// A snapshot entry is stored under a key that differs from its record's key.
    KeyMismatch { source: String, map_key: String, record_key: String },
    /// The same key appears more than once in one input.
    DuplicateKey { source: String, key: String, count: usize },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty duplicate composite, zero workers, etc.).
    ConfigValidation(String),
    /// JSON parse error while loading records.
    Json { source: String, message: String },
    /// IO error (file read, etc.).
    Io(String),
}

impl ReconError {
    /// True for violations of the key invariants. These abort the whole cycle.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyKey { .. } | Self::KeyMismatch { .. } | Self::DuplicateKey { .. }
        )
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey { source } => write!(f, "invalid input: {source}: record with empty key"),
            Self::KeyMismatch { source, map_key, record_key } => write!(
                f,
                "invalid input: {source}: entry '{map_key}' holds record keyed '{record_key}'"
            ),
            Self::DuplicateKey { source, key, count } => {
                write!(f, "invalid input: {source}: key '{key}' appears {count} times")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Json { source, message } => write!(f, "{source}: JSON error: {message}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
