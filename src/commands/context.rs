//! Shared context for command handlers
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Carry the Core config, extension manager and gateway state
//! - 1.0.0: Initial implementation with core shared state

use anyhow::Result;
use log::{debug, info, warn};
use serde_json::json;
use serenity::client::bridge::gateway::ShardManager;
use serenity::model::channel::Message;
use serenity::model::gateway::Activity;
use serenity::model::id::{GuildId, UserId};
use serenity::model::user::OnlineStatus;
use serenity::prelude::{Context, Mutex};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

use crate::config::{Config, ConfigContext};
use crate::extensions::ExtensionManager;

/// Owner name of the built-in configuration namespace
pub const CORE_OWNER: &str = "Core";
/// Identifier salting the built-in configuration namespace
pub const CORE_IDENTIFIER: u64 = 0;

/// The Core configuration with its defaults registered
pub fn core_config(ctx: &ConfigContext) -> crate::config::Result<Config> {
    let config = Config::get_conf(ctx, CORE_OWNER, CORE_IDENTIFIER)?;
    config.register_global(json!({
        "TOKEN": "",
        "prefixes": ["k", "!"],
        "description": "Red V3",
        "custom_info": null,
    }))?;
    config.register_guild(json!({ "prefixes": ["k", "!"] }))?;
    Ok(config)
}

/// Gateway token from the environment, else the one stored in the Core config
pub async fn resolve_token(from_env: Option<&str>, config: &Config) -> Result<String> {
    if let Some(token) = from_env {
        return Ok(token.to_string());
    }

    let stored: String = config.global().entry("TOKEN").get().await?;
    if stored.trim().is_empty() {
        anyhow::bail!("No token: set DISCORD_TOKEN or store TOKEN in the Core config");
    }
    Ok(stored)
}

/// The bot's own account, known once the gateway is ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: UserId,
    pub name: String,
}

/// Shared context for all command handlers
///
/// Contains what most handlers need:
/// - the Core config and the context every extension config lives in
/// - the extension manager
/// - an HTTP client for downloads
/// - owner, identity and presence state learned from the gateway
pub struct CommandContext {
    pub config: Config,
    pub config_ctx: ConfigContext,
    pub extensions: Arc<ExtensionManager>,
    pub http_client: reqwest::Client,
    pub start_time: std::time::Instant,
    owner_override: Option<UserId>,
    owner: RwLock<Option<UserId>>,
    identity: RwLock<Option<BotIdentity>>,
    presence: RwLock<(Option<Activity>, OnlineStatus)>,
    shard_manager: OnceCell<Arc<Mutex<ShardManager>>>,
}

impl CommandContext {
    /// Create a new CommandContext
    ///
    /// `owner_override` takes precedence over the application owner reported
    /// by Discord.
    pub fn new(
        config: Config,
        config_ctx: ConfigContext,
        extensions: Arc<ExtensionManager>,
        owner_override: Option<UserId>,
    ) -> Self {
        Self {
            config,
            config_ctx,
            extensions,
            http_client: reqwest::Client::new(),
            start_time: std::time::Instant::now(),
            owner_override,
            owner: RwLock::new(None),
            identity: RwLock::new(None),
            presence: RwLock::new((None, OnlineStatus::Online)),
            shard_manager: OnceCell::new(),
        }
    }

    /// Record the bot account from the ready event
    pub async fn set_ready(&self, identity: BotIdentity) {
        info!("🤖 Ready as {} ({})", identity.name, identity.id);
        *self.identity.write().await = Some(identity);
    }

    pub async fn identity(&self) -> Option<BotIdentity> {
        self.identity.read().await.clone()
    }

    /// Record the application owner reported by Discord
    pub async fn set_owner(&self, owner: UserId) {
        debug!("Application owner is {owner}");
        *self.owner.write().await = Some(owner);
    }

    pub async fn is_owner(&self, user: UserId) -> bool {
        if self.owner_override == Some(user) {
            return true;
        }
        *self.owner.read().await == Some(user)
    }

    /// Prefixes valid in `guild`, or the global ones for direct messages.
    ///
    /// A guild without its own prefixes uses the global prefixes.
    pub async fn prefixes_for(&self, guild: Option<GuildId>) -> Result<Vec<String>> {
        if let Some(guild) = guild {
            let prefixes: Vec<String> = self
                .config
                .guild(guild)
                .entry("prefixes")
                .with_default(json!([]))
                .get()
                .await?;
            if !prefixes.is_empty() {
                return Ok(prefixes);
            }
        }
        Ok(self.config.global().entry("prefixes").get().await?)
    }

    pub async fn presence(&self) -> (Option<Activity>, OnlineStatus) {
        self.presence.read().await.clone()
    }

    /// Change the gateway presence and remember it
    pub async fn set_presence(
        &self,
        serenity_ctx: &Context,
        activity: Option<Activity>,
        status: OnlineStatus,
    ) {
        serenity_ctx.set_presence(activity.clone(), status).await;
        *self.presence.write().await = (activity, status);
    }

    pub fn set_shard_manager(&self, manager: Arc<Mutex<ShardManager>>) {
        if self.shard_manager.set(manager).is_err() {
            warn!("Shard manager was already set");
        }
    }

    /// Close every shard, ending `Client::start`
    pub async fn shutdown(&self) {
        match self.shard_manager.get() {
            Some(manager) => {
                info!("👋 Shutting down");
                manager.lock().await.shutdown_all().await;
            }
            None => warn!("Shutdown requested before the client started"),
        }
    }
}

/// Acknowledge a command with a ✅ or ❌ reaction.
///
/// When reacting fails (missing permissions), `fallback` or the emoji is sent
/// as a message instead.
pub async fn tick(
    serenity_ctx: &Context,
    msg: &Message,
    success: bool,
    fallback: Option<&str>,
) -> Result<()> {
    let emoji = if success { '✅' } else { '❌' };
    if let Err(e) = msg.react(serenity_ctx, emoji).await {
        debug!("Reaction failed, sending text instead: {e}");
        let text = fallback.map(str::to_string).unwrap_or_else(|| emoji.to_string());
        msg.channel_id.say(&serenity_ctx.http, text).await?;
    }
    Ok(())
}
