//! Typed configuration accessors
//!
//! [`Config`] is what extensions and commands hold. It registers default
//! values per scope and hands out [`Group`]s (a scoped mapping) and
//! [`Entry`]s (one value inside a group). Every read and write goes through
//! the namespace's shared driver; a fresh [`PathKey`] is built per call.
//!
//! ```ignore
//! let config = Config::get_conf(&ctx, "Core", 0)?;
//! config.register_guild(json!({"prefixes": ["k", "!"]}))?;
//!
//! let prefixes: Vec<String> = config.guild(guild_id).entry("prefixes").get().await?;
//! config.guild(guild_id).entry("prefixes").set(&vec!["?"]).await?;
//! ```

use std::sync::Arc;

use dashmap::mapref::entry::Entry as DefaultsSlot;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};

use super::context::{ConfigContext, NamespaceState};
use super::driver::document;
use super::error::{kind_of, ConfigError, Result};
use super::identifier::{Namespace, PathKey, ScopeId};
use super::scope::ScopeKind;

impl From<GuildId> for ScopeId {
    fn from(id: GuildId) -> Self {
        ScopeId::Number(id.0)
    }
}

impl From<ChannelId> for ScopeId {
    fn from(id: ChannelId) -> Self {
        ScopeId::Number(id.0)
    }
}

impl From<RoleId> for ScopeId {
    fn from(id: RoleId) -> Self {
        ScopeId::Number(id.0)
    }
}

impl From<UserId> for ScopeId {
    fn from(id: UserId) -> Self {
        ScopeId::Number(id.0)
    }
}

/// Configuration handle for one owner namespace
#[derive(Clone)]
pub struct Config {
    namespace: Namespace,
    state: Arc<NamespaceState>,
}

impl Config {
    /// Configuration for `owner`, salted with `identifier`.
    ///
    /// Calls with the same owner and identifier share one driver and one
    /// defaults table.
    pub fn get_conf(ctx: &ConfigContext, owner: &str, identifier: u64) -> Result<Self> {
        let namespace = Namespace::new(owner, identifier.to_string())?;
        let state = ctx.namespace_state(&namespace);
        Ok(Self { namespace, state })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Declare the defaults of `scope`.
    ///
    /// Each scope takes one set of defaults; registering different defaults
    /// for an already registered scope fails instead of overwriting.
    pub fn register(&self, scope: ScopeKind, defaults: Value) -> Result<()> {
        if !defaults.is_object() {
            return Err(ConfigError::InvalidDefaults {
                scope,
                found: kind_of(&defaults),
            });
        }

        match self.state.defaults.entry(scope) {
            // Identical defaults again, as on an extension reload
            DefaultsSlot::Occupied(existing) if existing.get() == &defaults => Ok(()),
            DefaultsSlot::Occupied(_) => Err(ConfigError::AlreadyRegistered {
                owner: self.namespace.owner().to_string(),
                scope,
            }),
            DefaultsSlot::Vacant(slot) => {
                slot.insert(defaults);
                Ok(())
            }
        }
    }

    pub fn register_global(&self, defaults: Value) -> Result<()> {
        self.register(ScopeKind::Global, defaults)
    }

    pub fn register_guild(&self, defaults: Value) -> Result<()> {
        self.register(ScopeKind::Guild, defaults)
    }

    pub fn register_channel(&self, defaults: Value) -> Result<()> {
        self.register(ScopeKind::Channel, defaults)
    }

    pub fn register_role(&self, defaults: Value) -> Result<()> {
        self.register(ScopeKind::Role, defaults)
    }

    pub fn register_user(&self, defaults: Value) -> Result<()> {
        self.register(ScopeKind::User, defaults)
    }

    pub fn register_member(&self, defaults: Value) -> Result<()> {
        self.register(ScopeKind::Member, defaults)
    }

    /// Registered defaults of `scope`, or an empty mapping
    pub fn defaults(&self, scope: ScopeKind) -> Value {
        self.state
            .defaults
            .get(&scope)
            .map(|d| d.value().clone())
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    fn default_at(&self, scope: ScopeKind, path: &[String]) -> Option<Value> {
        let defaults = self.state.defaults.get(&scope)?;
        if path.is_empty() {
            return Some(defaults.value().clone());
        }
        match defaults.value() {
            Value::Object(map) => document::lookup(map, path).ok().flatten().cloned(),
            _ => None,
        }
    }

    /// Group addressed by explicit scope keys, checked against the scope's arity
    pub fn scope(&self, scope: ScopeKind, keys: Vec<ScopeId>) -> Result<Group> {
        if keys.len() != scope.arity() {
            return Err(ConfigError::InvalidArity {
                scope,
                expected: scope.arity(),
                actual: keys.len(),
            });
        }
        Ok(self.group_for(scope, keys))
    }

    fn group_for(&self, scope: ScopeKind, keys: Vec<ScopeId>) -> Group {
        Group {
            config: self.clone(),
            scope,
            keys,
            path: Vec::new(),
        }
    }

    pub fn global(&self) -> Group {
        self.group_for(ScopeKind::Global, Vec::new())
    }

    pub fn guild(&self, guild: impl Into<ScopeId>) -> Group {
        self.group_for(ScopeKind::Guild, vec![guild.into()])
    }

    pub fn channel(&self, channel: impl Into<ScopeId>) -> Group {
        self.group_for(ScopeKind::Channel, vec![channel.into()])
    }

    pub fn role(&self, role: impl Into<ScopeId>) -> Group {
        self.group_for(ScopeKind::Role, vec![role.into()])
    }

    pub fn user(&self, user: impl Into<ScopeId>) -> Group {
        self.group_for(ScopeKind::User, vec![user.into()])
    }

    pub fn member(&self, guild: impl Into<ScopeId>, user: impl Into<ScopeId>) -> Group {
        self.group_for(ScopeKind::Member, vec![guild.into(), user.into()])
    }

    /// Every stored entity of `scope`, each merged over the registered defaults.
    ///
    /// Keys are stringified scope keys; member entries are nested guild then user.
    pub async fn all(&self, scope: ScopeKind) -> Result<Map<String, Value>> {
        let stored = self.state.driver.get_all(scope).await?;
        let defaults = self.defaults(scope);

        match merge_at_depth(Value::Object(stored), scope.arity(), &defaults) {
            Value::Object(entries) => Ok(entries),
            _ => Ok(Map::new()),
        }
    }

    /// Remove every stored entity of `scope`
    pub async fn clear_all(&self, scope: ScopeKind) -> Result<()> {
        self.state.driver.clear_all(scope).await
    }
}

/// A mapping inside one scoped entity, optionally nested under a field path
#[derive(Clone)]
pub struct Group {
    config: Config,
    scope: ScopeKind,
    keys: Vec<ScopeId>,
    path: Vec<String>,
}

impl Group {
    pub fn scope(&self) -> ScopeKind {
        self.scope
    }

    /// Nested group under `name`
    pub fn group(&self, name: &str) -> Group {
        let mut nested = self.clone();
        nested.path.push(name.to_string());
        nested
    }

    /// Single value under `name`
    pub fn entry(&self, name: &str) -> Entry {
        let mut path = self.path.clone();
        path.push(name.to_string());
        let default = self.config.default_at(self.scope, &path);
        Entry {
            group: self.clone(),
            path,
            default,
        }
    }

    fn key(&self, path: Vec<String>, default: Value) -> Result<PathKey> {
        PathKey::new(
            self.config.namespace.clone(),
            self.scope,
            self.keys.clone(),
            path,
            default,
        )
    }

    fn join(&self, segments: &[&str]) -> Vec<String> {
        self.path
            .iter()
            .cloned()
            .chain(segments.iter().map(|s| s.to_string()))
            .collect()
    }

    /// Stored mapping merged over the registered defaults
    pub async fn all(&self) -> Result<Value> {
        let defaults = self
            .config
            .default_at(self.scope, &self.path)
            .unwrap_or_else(|| Value::Object(Map::new()));
        let key = self.key(self.path.clone(), Value::Object(Map::new()))?;
        let stored = self.config.state.driver.get(&key).await?;
        Ok(merge_defaults(&defaults, stored))
    }

    /// Remove everything stored in this group
    pub async fn clear(&self) -> Result<()> {
        let key = self.key(self.path.clone(), Value::Null)?;
        self.config.state.driver.clear(&key).await
    }

    /// Value at a relative path, falling back to the registered default
    pub async fn get_raw(&self, segments: &[&str]) -> Result<Value> {
        let path = self.join(segments);
        let default = self
            .config
            .default_at(self.scope, &path)
            .unwrap_or(Value::Null);
        let key = self.key(path, default)?;
        self.config.state.driver.get(&key).await
    }

    pub async fn set_raw(&self, segments: &[&str], value: Value) -> Result<()> {
        let key = self.key(self.join(segments), Value::Null)?;
        self.config.state.driver.set(&key, value).await
    }

    pub async fn clear_raw(&self, segments: &[&str]) -> Result<()> {
        let key = self.key(self.join(segments), Value::Null)?;
        self.config.state.driver.clear(&key).await
    }
}

/// One configuration value
#[derive(Clone)]
pub struct Entry {
    group: Group,
    path: Vec<String>,
    default: Option<Value>,
}

impl Entry {
    /// Override the registered default for reads through this entry
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn key(&self) -> Result<PathKey> {
        self.group.key(
            self.path.clone(),
            self.default.clone().unwrap_or(Value::Null),
        )
    }

    pub async fn get<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.get_raw().await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_raw(&self) -> Result<Value> {
        let key = self.key()?;
        self.group.config.state.driver.get(&key).await
    }

    pub async fn set<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        self.set_raw(serde_json::to_value(value)?).await
    }

    pub async fn set_raw(&self, value: Value) -> Result<()> {
        let key = self.key()?;
        self.group.config.state.driver.set(&key, value).await
    }

    pub async fn clear(&self) -> Result<()> {
        let key = self.key()?;
        self.group.config.state.driver.clear(&key).await
    }

    /// Atomically modify the value in place; returns the stored result
    pub async fn update<F>(&self, f: F) -> Result<Value>
    where
        F: FnOnce(&mut Value) + Send + 'static,
    {
        let key = self.key()?;
        self.group.config.state.driver.update(&key, Box::new(f)).await
    }
}

/// Fill in keys missing from `stored` with values from `defaults`, recursively.
pub fn merge_defaults(defaults: &Value, stored: Value) -> Value {
    match (defaults, stored) {
        (Value::Object(defaults), Value::Object(mut stored)) => {
            for (name, default) in defaults {
                let merged = match stored.remove(name) {
                    Some(existing) => merge_defaults(default, existing),
                    None => default.clone(),
                };
                stored.insert(name.clone(), merged);
            }
            Value::Object(stored)
        }
        (_, stored) => stored,
    }
}

fn merge_at_depth(value: Value, depth: usize, defaults: &Value) -> Value {
    if depth == 0 {
        return merge_defaults(defaults, value);
    }
    match value {
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(id, entry)| (id, merge_at_depth(entry, depth - 1, defaults)))
                .collect(),
        ),
        other => other,
    }
}
