//! # Feature: Extensions
//!
//! Compiled-in extensions that can be loaded, unloaded and reloaded at
//! runtime. Each extension gets its own configuration namespace from the
//! shared `ConfigContext` and contributes prefix commands plus an optional
//! message hook.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Reload rebuilds the extension from its factory
//! - 1.0.0: Initial release with the stats extension

pub mod stats;

use anyhow::Result;
use async_trait::async_trait;
use log::{error, info, warn};
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::commands::handler::MessageCommandHandler;
use crate::commands::registry::CommandRegistry;
use crate::config::ConfigContext;

/// A loadable bundle of commands and hooks
#[async_trait]
pub trait Extension: Send + Sync {
    fn name(&self) -> &'static str;

    /// Command handlers registered while the extension is loaded
    fn handlers(&self) -> Vec<Arc<dyn MessageCommandHandler>>;

    /// Called for every message while loaded, before command dispatch
    async fn on_message(&self, _serenity_ctx: &Context, _msg: &Message) -> Result<()> {
        Ok(())
    }

    /// Called when the extension is unloaded or replaced by a reload
    async fn teardown(&self) -> Result<()> {
        Ok(())
    }
}

/// Builds an extension against the shared configuration context
pub type ExtensionFactory = fn(&ConfigContext) -> Result<Arc<dyn Extension>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtensionError {
    #[error("no extension named `{0}`")]
    NotFound(String),

    #[error("extension `{0}` is already loaded")]
    AlreadyLoaded(String),

    #[error("extension `{0}` is not loaded")]
    NotLoaded(String),

    #[error("extension `{name}` failed to set up: {reason}")]
    SetupFailed { name: String, reason: String },
}

struct LoadedExtension {
    extension: Arc<dyn Extension>,
    registry: Arc<CommandRegistry>,
}

/// Tracks which extensions are available and which are loaded
pub struct ExtensionManager {
    config_ctx: ConfigContext,
    available: BTreeMap<&'static str, ExtensionFactory>,
    loaded: RwLock<BTreeMap<&'static str, LoadedExtension>>,
}

impl ExtensionManager {
    /// Manager offering every built-in extension
    pub fn new(config_ctx: ConfigContext) -> Self {
        Self::with_factories(config_ctx, [(stats::NAME, stats::factory as ExtensionFactory)])
    }

    pub fn with_factories(
        config_ctx: ConfigContext,
        factories: impl IntoIterator<Item = (&'static str, ExtensionFactory)>,
    ) -> Self {
        Self {
            config_ctx,
            available: factories.into_iter().collect(),
            loaded: RwLock::new(BTreeMap::new()),
        }
    }

    fn build(&self, name: &str) -> Result<(&'static str, LoadedExtension), ExtensionError> {
        let (&key, factory) = self
            .available
            .get_key_value(name)
            .ok_or_else(|| ExtensionError::NotFound(name.to_string()))?;

        let extension = factory(&self.config_ctx).map_err(|e| {
            error!("❌ Extension {key} failed to set up: {e:#}");
            ExtensionError::SetupFailed {
                name: key.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut registry = CommandRegistry::new();
        for handler in extension.handlers() {
            registry.register(handler);
        }

        Ok((
            key,
            LoadedExtension {
                extension,
                registry: Arc::new(registry),
            },
        ))
    }

    pub async fn load(&self, name: &str) -> Result<(), ExtensionError> {
        let mut loaded = self.loaded.write().await;
        if loaded.contains_key(name) {
            return Err(ExtensionError::AlreadyLoaded(name.to_string()));
        }

        let (key, extension) = self.build(name)?;
        loaded.insert(key, extension);
        info!("🧩 Loaded extension {key}");
        Ok(())
    }

    pub async fn unload(&self, name: &str) -> Result<(), ExtensionError> {
        let removed = self
            .loaded
            .write()
            .await
            .remove(name)
            .ok_or_else(|| ExtensionError::NotLoaded(name.to_string()))?;

        if let Err(e) = removed.extension.teardown().await {
            warn!("Extension {name} teardown failed: {e:#}");
        }
        info!("🧩 Unloaded extension {name}");
        Ok(())
    }

    /// Replace a loaded extension with a freshly built one.
    ///
    /// If the rebuild fails the extension stays unloaded.
    pub async fn reload(&self, name: &str) -> Result<(), ExtensionError> {
        let mut loaded = self.loaded.write().await;
        let old = loaded
            .remove(name)
            .ok_or_else(|| ExtensionError::NotLoaded(name.to_string()))?;

        if let Err(e) = old.extension.teardown().await {
            warn!("Extension {name} teardown failed: {e:#}");
        }

        let (key, extension) = self.build(name)?;
        loaded.insert(key, extension);
        info!("🔄 Reloaded extension {key}");
        Ok(())
    }

    pub async fn loaded_names(&self) -> Vec<&'static str> {
        self.loaded.read().await.keys().copied().collect()
    }

    pub fn available_names(&self) -> Vec<&'static str> {
        self.available.keys().copied().collect()
    }

    /// Command registries of the loaded extensions, by extension name
    pub async fn registries(&self) -> Vec<(&'static str, Arc<CommandRegistry>)> {
        self.loaded
            .read()
            .await
            .iter()
            .map(|(name, loaded)| (*name, Arc::clone(&loaded.registry)))
            .collect()
    }

    /// Run every loaded extension's message hook.
    ///
    /// Hook failures are logged and do not stop other extensions.
    pub async fn dispatch_message(&self, serenity_ctx: &Context, msg: &Message) {
        let extensions: Vec<Arc<dyn Extension>> = self
            .loaded
            .read()
            .await
            .values()
            .map(|loaded| Arc::clone(&loaded.extension))
            .collect();

        for extension in extensions {
            if let Err(e) = extension.on_message(serenity_ctx, msg).await {
                warn!("Extension {} message hook failed: {e:#}", extension.name());
            }
        }
    }
}
