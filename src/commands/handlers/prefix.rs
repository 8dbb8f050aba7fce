//! Prefix settings
//!
//! Handles: set prefix, set serverprefix

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serenity::model::channel::Message;
use serenity::model::permissions::Permissions;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::checks::{require_admin_or, require_owner};
use crate::commands::context::{tick, CommandContext};
use crate::commands::error::CommandError;
use crate::commands::handler::MessageCommandHandler;
use crate::commands::parser::Invocation;

/// Distinct prefixes in the order given
pub fn collect_prefixes(args: &[&str]) -> Vec<String> {
    let mut prefixes: Vec<String> = Vec::with_capacity(args.len());
    for arg in args {
        if !prefixes.iter().any(|p| p == arg) {
            prefixes.push(arg.to_string());
        }
    }
    prefixes
}

fn confirmation(count: usize) -> &'static str {
    if count == 1 {
        "Prefix set."
    } else {
        "Prefixes set."
    }
}

pub struct PrefixHandler;

#[async_trait]
impl MessageCommandHandler for PrefixHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["set prefix", "set serverprefix"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
    ) -> Result<()> {
        let prefixes = collect_prefixes(&invocation.arg_list());

        if invocation.command == "set prefix" {
            require_owner(&ctx, msg).await?;
            if prefixes.is_empty() {
                return Err(CommandError::MissingArgument {
                    usage: "set prefix <prefixes...>",
                }
                .into());
            }

            ctx.config.global().entry("prefixes").set(&prefixes).await?;
            info!("Global prefixes set to {prefixes:?}");
            return tick(serenity_ctx, msg, true, Some(confirmation(prefixes.len()))).await;
        }

        let guild_id = require_admin_or(&ctx, serenity_ctx, msg, Permissions::MANAGE_GUILD).await?;
        let entry = ctx.config.guild(guild_id).entry("prefixes");
        if prefixes.is_empty() {
            entry.clear().await?;
            info!("Prefixes reset in {guild_id}");
            return tick(serenity_ctx, msg, true, Some("Guild prefixes have been reset.")).await;
        }

        entry.set(&prefixes).await?;
        info!("Prefixes in {guild_id} set to {prefixes:?}");
        tick(serenity_ctx, msg, true, Some(confirmation(prefixes.len()))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_prefixes_dedupes_in_order() {
        assert_eq!(collect_prefixes(&["!", "?", "!"]), vec!["!", "?"]);
        assert!(collect_prefixes(&[]).is_empty());
    }

    #[test]
    fn test_confirmation() {
        assert_eq!(confirmation(1), "Prefix set.");
        assert_eq!(confirmation(3), "Prefixes set.");
    }
}
