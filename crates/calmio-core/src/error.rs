//! Core error types for calmio-core.
//!
//! Mirrors the failure kinds the library can surface: bad breathing
//! patterns, session bookkeeping misuse, persistence trouble, configuration
//! problems and invalid caller-supplied values.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for calmio-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Pattern rejected at construction or `set_pattern` time
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    /// Session ledger misuse
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Backing document could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Breathing pattern errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// A pattern needs at least one phase
    #[error("pattern has no phases")]
    Empty,

    /// Every phase must last at least one millisecond
    #[error("phase {index} has a zero duration")]
    ZeroDuration { index: usize },

    /// Lookup by id found nothing
    #[error("unknown pattern: {0}")]
    UnknownPattern(String),
}

/// Session ledger errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `end_session` or `record_cycle` without `begin_session`
    #[error("no active session")]
    NoActiveSession,
}

/// Persistence-specific errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The document exists but cannot be decoded
    #[error("corrupt document in {source_name}: {message}")]
    Corrupt { source_name: String, message: String },

    /// Reading or writing the backing file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the document failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Dot-path key does not exist
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
