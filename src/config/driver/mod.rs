//! # Config Drivers
//!
//! Persistence backends for configuration documents. A driver serves exactly
//! one [`Namespace`] and serializes every operation on it behind a single
//! lock, so callers sharing a driver share one cache and one consistency
//! domain.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Add `update`, `get_all` and `clear_all`
//! - 1.0.0: Initial driver contract with JSON file backend

pub mod document;
pub mod json;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::Result;
use super::identifier::{Namespace, PathKey};
use super::scope::ScopeKind;

pub use json::FileDriver;

/// Mutation applied by [`Driver::update`] to the current value of a key
pub type UpdateFn = Box<dyn FnOnce(&mut Value) + Send>;

/// Storage backend contract
///
/// Every method copies values in or out; no caller ever holds a reference
/// into the driver's document.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Namespace this driver serves
    fn namespace(&self) -> &Namespace;

    /// Stored value at `key`, or a copy of the key's default
    async fn get(&self, key: &PathKey) -> Result<Value>;

    /// Store `value` at `key` and persist before returning
    async fn set(&self, key: &PathKey, value: Value) -> Result<()>;

    /// Remove the value at `key`; absent keys are not an error
    async fn clear(&self, key: &PathKey) -> Result<()>;

    /// Read-modify-write of one key under the driver lock. Returns the new value.
    async fn update(&self, key: &PathKey, f: UpdateFn) -> Result<Value>;

    /// Copy of every stored entry of `scope`
    async fn get_all(&self, scope: ScopeKind) -> Result<Map<String, Value>>;

    /// Remove every stored entry of `scope`
    async fn clear_all(&self, scope: ScopeKind) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Drivers are shared as trait objects by the context
    fn _assert_object_safe(_: &dyn Driver) {}
}
