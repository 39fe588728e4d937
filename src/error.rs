use std::path::PathBuf;

use thiserror::Error;

/// Why a policy file could not be turned into a snapshot.
#[derive(Debug, Error)]
pub enum PolicyLoadCause {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected 3 fields (host,minHour,maxHour), found {fields}")]
    MalformedRule { line: usize, fields: usize },
}

/// Unified error type for the hourgate library.
#[derive(Debug, Error)]
pub enum HourgateError {
    #[error("Policy load error ({}): {cause}", path.display())]
    PolicyLoad {
        path: PathBuf,
        #[source]
        cause: PolicyLoadCause,
    },

    #[error("Pattern match error for '{pattern}': {source}")]
    Match {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Admin error: {0}")]
    Admin(String),
}

impl HourgateError {
    pub(crate) fn load(path: impl Into<PathBuf>, cause: impl Into<PolicyLoadCause>) -> Self {
        HourgateError::PolicyLoad {
            path: path.into(),
            cause: cause.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HourgateError>;
