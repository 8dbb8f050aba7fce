//! Storage addresses for configuration values
//!
//! A [`PathKey`] names exactly one location inside one owner's settings
//! document. Keys are validated when they are built so that a malformed
//! address never reaches a driver.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value;

use super::error::{ConfigError, Result};
use super::scope::ScopeKind;

/// Owner name plus salt: the unit of isolation between configuration users.
///
/// Both parts end up in a file path, so they are restricted to ASCII
/// alphanumerics, `_`, `-` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    owner: String,
    salt: String,
}

impl Namespace {
    pub fn new(owner: impl Into<String>, salt: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let salt = salt.into();
        validate_path_component("owner", &owner)?;
        validate_path_component("salt", &salt)?;
        Ok(Self { owner, salt })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.salt)
    }
}

fn validate_path_component(kind: &'static str, value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value == "." || value == ".." {
        Some("must not be a relative directory name")
    } else if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        Some("only ASCII letters, digits, '_', '-' and '.' are allowed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidIdentifier {
            kind,
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// One scope-identifying key: a numeric id (guild, user, ...) or a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeId {
    Number(u64),
    Negative(i64),
    Text(String),
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeId::Number(n) => write!(f, "{n}"),
            ScopeId::Negative(n) => write!(f, "{n}"),
            ScopeId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ScopeId {
    fn from(value: u64) -> Self {
        ScopeId::Number(value)
    }
}

impl From<i64> for ScopeId {
    fn from(value: i64) -> Self {
        // Non-negative values must address the same location as their u64 twin
        match u64::try_from(value) {
            Ok(n) => ScopeId::Number(n),
            Err(_) => ScopeId::Negative(value),
        }
    }
}

impl From<&str> for ScopeId {
    fn from(value: &str) -> Self {
        ScopeId::from(value.to_string())
    }
}

impl From<String> for ScopeId {
    /// Text in canonical integer form addresses the same location as the number
    fn from(value: String) -> Self {
        if let Ok(n) = value.parse::<u64>() {
            if n.to_string() == value {
                return ScopeId::Number(n);
            }
        }
        if let Ok(n) = value.parse::<i64>() {
            if n.to_string() == value {
                return ScopeId::from(n);
            }
        }
        ScopeId::Text(value)
    }
}

/// Fully-qualified address of one configuration value.
///
/// Equality and hashing cover the namespace, scope, scope keys and field
/// path. The default value is carried along for drivers to hand back when the
/// location is unset, but it is not part of the key's identity.
#[derive(Debug, Clone)]
pub struct PathKey {
    namespace: Namespace,
    scope: ScopeKind,
    scope_keys: Vec<ScopeId>,
    field_path: Vec<String>,
    default: Value,
}

impl PathKey {
    /// Build a key, checking scope arity and field path segments.
    pub fn new(
        namespace: Namespace,
        scope: ScopeKind,
        scope_keys: Vec<ScopeId>,
        field_path: Vec<String>,
        default: Value,
    ) -> Result<Self> {
        if scope_keys.len() != scope.arity() {
            return Err(ConfigError::InvalidArity {
                scope,
                expected: scope.arity(),
                actual: scope_keys.len(),
            });
        }

        for key in &scope_keys {
            if matches!(key, ScopeId::Text(text) if text.is_empty()) {
                return Err(ConfigError::InvalidIdentifier {
                    kind: "scope key",
                    value: String::new(),
                    reason: "must not be empty",
                });
            }
        }

        if let Some(index) = field_path.iter().position(|segment| segment.is_empty()) {
            return Err(ConfigError::EmptyFieldSegment { index });
        }

        Ok(Self {
            namespace,
            scope,
            scope_keys,
            field_path,
            default,
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn scope(&self) -> ScopeKind {
        self.scope
    }

    pub fn scope_keys(&self) -> &[ScopeId] {
        &self.scope_keys
    }

    pub fn field_path(&self) -> &[String] {
        &self.field_path
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Navigation path inside a settings document:
    /// scope name, then stringified scope keys, then field path segments.
    pub fn document_path(&self) -> Vec<String> {
        let mut path = Vec::with_capacity(1 + self.scope_keys.len() + self.field_path.len());
        path.push(self.scope.name().to_string());
        path.extend(self.scope_keys.iter().map(ToString::to_string));
        path.extend(self.field_path.iter().cloned());
        path
    }
}

impl PartialEq for PathKey {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.scope == other.scope
            && self.scope_keys == other.scope_keys
            && self.field_path == other.field_path
    }
}

impl Eq for PathKey {}

impl Hash for PathKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.scope.hash(state);
        self.scope_keys.hash(state);
        self.field_path.hash(state);
    }
}
