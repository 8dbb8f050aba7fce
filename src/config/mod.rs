//! # Config Module
//!
//! Hierarchical, namespace-scoped settings storage shared by the bot core and
//! its extensions. Values live in one JSON document per owner namespace,
//! addressed by scope (global, guild, channel, role, user, member), scope keys
//! and a field path.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Explicit `ConfigContext` replaces the global driver registry
//! - 1.1.0: Reject duplicate default registration
//! - 1.0.0: Initial scoped config with JSON file driver

pub mod context;
pub mod driver;
pub mod error;
pub mod facade;
pub mod identifier;
pub mod scope;

pub use context::ConfigContext;
pub use driver::{Driver, FileDriver};
pub use error::{ConfigError, Result};
pub use facade::{merge_defaults, Config, Entry, Group};
pub use identifier::{Namespace, PathKey, ScopeId};
pub use scope::ScopeKind;
