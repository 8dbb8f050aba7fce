//! Error types for the configuration subsystem.

use std::path::PathBuf;

use thiserror::Error;

use super::scope::ScopeKind;

/// Errors raised while building keys, registering defaults or talking to a driver.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The number of scope keys does not match the scope's arity.
    #[error("{scope} scope takes {expected} identifying key(s), got {actual}")]
    InvalidArity {
        scope: ScopeKind,
        expected: usize,
        actual: usize,
    },

    /// An owner, salt or scope key cannot be used as an identifier.
    #[error("invalid {kind} identifier {value:?}: {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },

    /// A field path contains an empty segment.
    #[error("field path segment {index} is empty")]
    EmptyFieldSegment { index: usize },

    /// The resolved path runs through a value that is not a mapping.
    #[error("cannot descend into {path:?}: {found} found where a mapping was expected")]
    Structural { path: Vec<String>, found: &'static str },

    /// An existing settings file could not be parsed.
    #[error("failed to load settings file {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Reading, writing or replacing a settings file failed.
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A typed accessor could not convert a value.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Defaults for this owner and scope were already registered.
    #[error("defaults for {scope} are already registered for {owner}")]
    AlreadyRegistered { owner: String, scope: ScopeKind },

    /// Registered defaults must be a JSON object.
    #[error("defaults for {scope} must be an object, got {found}")]
    InvalidDefaults { scope: ScopeKind, found: &'static str },

    /// A key belonging to another namespace was handed to a driver.
    #[error("key for {key_owner}/{key_salt} used with driver for {owner}/{salt}")]
    ForeignKey {
        owner: String,
        salt: String,
        key_owner: String,
        key_salt: String,
    },

    /// The task running a critical section did not finish.
    #[error("driver task failed: {0}")]
    TaskFailed(String),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for configuration results.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Human-readable name of a JSON value's kind, used in error messages.
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "mapping",
    }
}
