//! Error types for todolist
//!
//! Every failure is classified into one of four kinds:
//! - Network: the seed fetch could not reach the endpoint or got a non-2xx status
//! - Decode: the seed payload did not have the expected shape
//! - Store: a durable read or write failed
//! - Config: the configuration file is unreadable or invalid
//!
//! Only `StoreCorrupted` is fatal; it aborts startup.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used by callers that only care about the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Decode,
    Store,
    Config,
}

/// Main error type for todolist operations
#[derive(Error, Debug)]
pub enum Error {
    // Seed source failures
    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    // Store failures
    #[error("Task store corrupted at {path}: {reason}")]
    StoreCorrupted { path: PathBuf, reason: String },

    #[error("Duplicate task id: {0}")]
    DuplicateTask(i64),

    #[error("Invalid seed task id: {0} (remote ids must be positive)")]
    InvalidSeedId(i64),

    #[error("Local task ids exhausted")]
    LocalIdsExhausted,

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Task store lock poisoned")]
    LockPoisoned,

    #[error("Background task failed: {0}")]
    Background(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network(_) => ErrorKind::Network,

            Error::Decode(_) => ErrorKind::Decode,

            Error::StoreCorrupted { .. }
            | Error::DuplicateTask(_)
            | Error::InvalidSeedId(_)
            | Error::LocalIdsExhausted
            | Error::LockFailed(_)
            | Error::LockPoisoned
            | Error::Background(_)
            | Error::Io(_)
            | Error::Json(_) => ErrorKind::Store,

            Error::InvalidConfig(_) | Error::TomlParse(_) | Error::TomlSerialize(_) => {
                ErrorKind::Config
            }
        }
    }

    /// Whether the process cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::StoreCorrupted { .. })
    }
}

/// Result type alias for todolist operations
pub type Result<T> = std::result::Result<T, Error>;
