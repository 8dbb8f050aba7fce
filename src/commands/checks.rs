//! Invocation checks shared by command handlers
//!
//! Each check returns `CommandError::CheckFailed` wrapped in `anyhow` so a
//! handler can simply use `?`.

use anyhow::Result;
use serenity::model::channel::Message;
use serenity::model::id::GuildId;
use serenity::model::permissions::Permissions;
use serenity::prelude::Context;

use super::context::CommandContext;
use super::error::CommandError;

/// The author must own the bot
pub async fn require_owner(ctx: &CommandContext, msg: &Message) -> Result<()> {
    if ctx.is_owner(msg.author.id).await {
        Ok(())
    } else {
        Err(CommandError::CheckFailed("owner only").into())
    }
}

/// The message must come from a guild channel
pub fn require_guild(msg: &Message) -> Result<GuildId> {
    msg.guild_id
        .ok_or_else(|| CommandError::CheckFailed("guild only").into())
}

/// The bot must have joined at least one guild
pub fn require_bot_in_guild(serenity_ctx: &Context) -> Result<()> {
    if in_any_guild(serenity_ctx.cache.guild_count()) {
        Ok(())
    } else {
        Err(CommandError::CheckFailed("bot is not in any guild").into())
    }
}

pub fn in_any_guild(guild_count: usize) -> bool {
    guild_count > 0
}

/// Administrators hold every permission
pub fn permits(held: Permissions, wanted: Permissions) -> bool {
    held.administrator() || held.intersects(wanted)
}

/// The author must be the bot owner, or an administrator or holder of
/// `wanted` in the message's guild.
pub async fn require_admin_or(
    ctx: &CommandContext,
    serenity_ctx: &Context,
    msg: &Message,
    wanted: Permissions,
) -> Result<GuildId> {
    let guild_id = require_guild(msg)?;
    if ctx.is_owner(msg.author.id).await {
        return Ok(guild_id);
    }

    let member = msg.member(serenity_ctx).await?;
    let held = member.permissions(serenity_ctx)?;
    if permits(held, wanted) {
        Ok(guild_id)
    } else {
        Err(CommandError::CheckFailed("missing permissions").into())
    }
}
