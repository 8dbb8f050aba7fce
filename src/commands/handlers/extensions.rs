//! Extension management commands
//!
//! Handles: load, unload, reload, extensions

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::checks::require_owner;
use crate::commands::context::CommandContext;
use crate::commands::error::CommandError;
use crate::commands::handler::MessageCommandHandler;
use crate::commands::parser::Invocation;
use crate::core::{humanize_list, inline, truncate_for_message};
use crate::extensions::ExtensionError;

/// One reply line for the outcome of `action` on `name`
pub fn describe(action: &str, name: &str, outcome: &Result<(), ExtensionError>) -> String {
    let name = inline(name);
    match (action, outcome) {
        ("load", Ok(())) => format!("Loaded {name}."),
        ("unload", Ok(())) => format!("Unloaded {name}."),
        (_, Ok(())) => format!("Reloaded {name}."),
        (_, Err(ExtensionError::NotFound(_))) => format!("No extension named {name} exists."),
        (_, Err(ExtensionError::AlreadyLoaded(_))) => format!("{name} is already loaded."),
        ("reload", Err(ExtensionError::NotLoaded(_))) => {
            format!("{name} is not loaded, use load instead.")
        }
        (_, Err(ExtensionError::NotLoaded(_))) => format!("{name} was not loaded."),
        (_, Err(ExtensionError::SetupFailed { .. })) => {
            format!("Failed to {action} {name}. Check the logs for details.")
        }
    }
}

pub struct ExtensionsHandler;

#[async_trait]
impl MessageCommandHandler for ExtensionsHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["load", "unload", "reload", "extensions"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
    ) -> Result<()> {
        require_owner(&ctx, msg).await?;
        let manager = &ctx.extensions;

        if invocation.command == "extensions" {
            let loaded = manager.loaded_names().await;
            let unloaded: Vec<&str> = manager
                .available_names()
                .into_iter()
                .filter(|name| !loaded.contains(name))
                .collect();
            let list = |names: &[&str]| {
                if names.is_empty() {
                    "none".to_string()
                } else {
                    humanize_list(names)
                }
            };
            let reply = format!("Loaded: {}\nUnloaded: {}", list(&loaded), list(&unloaded));
            msg.channel_id.say(&serenity_ctx.http, reply).await?;
            return Ok(());
        }

        let names = invocation.arg_list();
        if names.is_empty() {
            return Err(CommandError::MissingArgument {
                usage: "load|unload|reload <extension...>",
            }
            .into());
        }

        let mut lines = Vec::with_capacity(names.len());
        for name in names {
            let outcome = match invocation.command.as_str() {
                "load" => manager.load(name).await,
                "unload" => manager.unload(name).await,
                _ => manager.reload(name).await,
            };
            lines.push(describe(&invocation.command, name, &outcome));
        }

        msg.channel_id
            .say(&serenity_ctx.http, truncate_for_message(&lines.join("\n")))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_success() {
        assert_eq!(describe("load", "stats", &Ok(())), "Loaded `stats`.");
        assert_eq!(describe("unload", "stats", &Ok(())), "Unloaded `stats`.");
        assert_eq!(describe("reload", "stats", &Ok(())), "Reloaded `stats`.");
    }

    #[test]
    fn test_describe_failures_are_distinct() {
        let not_found = describe("load", "x", &Err(ExtensionError::NotFound("x".into())));
        let already = describe("load", "x", &Err(ExtensionError::AlreadyLoaded("x".into())));
        let not_loaded = describe("unload", "x", &Err(ExtensionError::NotLoaded("x".into())));
        let reload_not_loaded =
            describe("reload", "x", &Err(ExtensionError::NotLoaded("x".into())));
        let failed = describe(
            "load",
            "x",
            &Err(ExtensionError::SetupFailed {
                name: "x".into(),
                reason: "boom".into(),
            }),
        );

        assert_eq!(not_found, "No extension named `x` exists.");
        assert_eq!(already, "`x` is already loaded.");
        assert_eq!(not_loaded, "`x` was not loaded.");
        assert_eq!(reload_not_loaded, "`x` is not loaded, use load instead.");
        assert_eq!(failed, "Failed to load `x`. Check the logs for details.");
    }
}
