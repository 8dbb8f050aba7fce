//! Per-member message counters
//!
//! Counts messages per guild member in the `MEMBER` scope of the `Stats`
//! namespace. Commands: `stats [member]`, `stats reset`, `stats top`.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde_json::{json, Value};
use serenity::model::channel::Message;
use serenity::model::id::{GuildId, UserId};
use serenity::prelude::Context;
use std::sync::Arc;

use super::Extension;
use crate::commands::checks::require_guild;
use crate::commands::context::{tick, CommandContext};
use crate::commands::error::CommandError;
use crate::commands::handler::MessageCommandHandler;
use crate::commands::parser::Invocation;
use crate::config::{Config, ConfigContext, ScopeKind};
use crate::core::bold;

pub const NAME: &str = "stats";
const OWNER: &str = "Stats";
const IDENTIFIER: u64 = 2_711_759_130;
const TOP_LIMIT: usize = 5;

pub fn factory(ctx: &ConfigContext) -> Result<Arc<dyn Extension>> {
    Ok(Arc::new(StatsExtension {
        stats: Arc::new(Stats::new(ctx)?),
    }))
}

/// Accepts `<@id>`, `<@!id>` or a bare id
pub fn parse_user(arg: &str) -> Option<UserId> {
    let pattern = Regex::new(r"^(?:<@!?(\d+)>|(\d+))$").ok()?;
    let captures = pattern.captures(arg.trim())?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .and_then(|id| id.as_str().parse().ok())
        .map(UserId)
}

/// Counter storage
pub struct Stats {
    config: Config,
}

impl Stats {
    pub fn new(ctx: &ConfigContext) -> Result<Self> {
        let config = Config::get_conf(ctx, OWNER, IDENTIFIER)?;
        config.register_member(json!({ "messages": 0 }))?;
        Ok(Self { config })
    }

    /// Count one message, returning the new total
    pub async fn record(&self, guild: GuildId, user: UserId) -> Result<u64> {
        let updated = self
            .config
            .member(guild, user)
            .entry("messages")
            .update(|count| *count = json!(count.as_u64().unwrap_or(0) + 1))
            .await?;
        Ok(updated.as_u64().unwrap_or(0))
    }

    pub async fn count(&self, guild: GuildId, user: UserId) -> Result<u64> {
        Ok(self.config.member(guild, user).entry("messages").get().await?)
    }

    pub async fn reset(&self, guild: GuildId, user: UserId) -> Result<()> {
        self.config.member(guild, user).clear().await?;
        Ok(())
    }

    /// Highest counters in `guild`, largest first
    pub async fn top(&self, guild: GuildId, limit: usize) -> Result<Vec<(UserId, u64)>> {
        let all = self.config.all(ScopeKind::Member).await?;
        let mut ranked: Vec<(UserId, u64)> = all
            .get(&guild.0.to_string())
            .and_then(Value::as_object)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|(user, data)| {
                        let id = user.parse().ok().map(UserId)?;
                        Some((id, data.get("messages")?.as_u64()?))
                    })
                    .collect()
            })
            .unwrap_or_default();

        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);
        Ok(ranked)
    }
}

struct StatsExtension {
    stats: Arc<Stats>,
}

#[async_trait]
impl Extension for StatsExtension {
    fn name(&self) -> &'static str {
        NAME
    }

    fn handlers(&self) -> Vec<Arc<dyn MessageCommandHandler>> {
        vec![Arc::new(StatsHandler {
            stats: Arc::clone(&self.stats),
        })]
    }

    async fn on_message(&self, _serenity_ctx: &Context, msg: &Message) -> Result<()> {
        let Some(guild) = msg.guild_id else {
            return Ok(());
        };
        if msg.author.bot {
            return Ok(());
        }
        let total = self.stats.record(guild, msg.author.id).await?;
        debug!("{} has {total} messages in {guild}", msg.author.id);
        Ok(())
    }
}

struct StatsHandler {
    stats: Arc<Stats>,
}

#[async_trait]
impl MessageCommandHandler for StatsHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["stats", "stats reset", "stats top"]
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
    ) -> Result<()> {
        let guild = require_guild(msg)?;

        match invocation.command.as_str() {
            "stats reset" => {
                self.stats.reset(guild, msg.author.id).await?;
                tick(serenity_ctx, msg, true, Some("Your message count was reset.")).await?;
            }
            "stats top" => {
                let ranked = self.stats.top(guild, TOP_LIMIT).await?;
                let reply = if ranked.is_empty() {
                    "No messages counted yet.".to_string()
                } else {
                    ranked
                        .iter()
                        .enumerate()
                        .map(|(rank, (user, count))| format!("{}. <@{user}>: {count}", rank + 1))
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                msg.channel_id.say(&serenity_ctx.http, reply).await?;
            }
            _ => {
                let target = match invocation.args() {
                    "" => msg.author.id,
                    arg => parse_user(arg).ok_or_else(|| {
                        CommandError::BadArgument(format!("`{arg}` is not a member."))
                    })?,
                };
                let count = self.stats.count(guild, target).await?;
                let reply = format!(
                    "<@{target}> has sent {} messages here.",
                    bold(&count.to_string())
                );
                msg.channel_id.say(&serenity_ctx.http, reply).await?;
            }
        }

        Ok(())
    }
}
