//! Utility command handlers
//!
//! Handles: ping, info, uptime, shutdown
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Prefix commands; info reads description and custom info from the Core config
//! - 1.0.0: Extracted from command_handler.rs

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serde_json::Value;
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::sync::Arc;
use std::time::Duration;

use crate::commands::checks::require_owner;
use crate::commands::context::CommandContext;
use crate::commands::handler::MessageCommandHandler;
use crate::commands::parser::Invocation;
use crate::core::{bold, humanize_list, truncate_for_message};

/// Handler for utility commands: ping, info, uptime, shutdown
pub struct UtilityHandler;

#[async_trait]
impl MessageCommandHandler for UtilityHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["ping", "info", "uptime", "shutdown"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
    ) -> Result<()> {
        match invocation.command.as_str() {
            "ping" => {
                msg.channel_id.say(&serenity_ctx.http, "Pong.").await?;
                Ok(())
            }
            "info" => self.handle_info(&ctx, serenity_ctx, msg).await,
            "uptime" => {
                let uptime = format_uptime(ctx.start_time.elapsed());
                msg.channel_id
                    .say(&serenity_ctx.http, format!("⏱️ Uptime: {uptime}"))
                    .await?;
                Ok(())
            }
            "shutdown" => self.handle_shutdown(&ctx, serenity_ctx, msg).await,
            _ => Ok(()),
        }
    }
}

impl UtilityHandler {
    async fn handle_info(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        msg: &Message,
    ) -> Result<()> {
        let global = ctx.config.global();
        let description: String = global.entry("description").get().await?;
        let custom_info: Value = global.entry("custom_info").get_raw().await?;
        let extensions = ctx.extensions.loaded_names().await;

        let mut output = format!("{}\n\n", bold(&description));
        if let Value::String(custom) = custom_info {
            output.push_str(&custom);
            output.push_str("\n\n");
        }
        output.push_str(&format!(
            "⏱️ Uptime: {}\n",
            format_uptime(ctx.start_time.elapsed())
        ));
        output.push_str(&format!(
            "🧩 Extensions: {}\n📦 Version: {}",
            if extensions.is_empty() {
                "none".to_string()
            } else {
                humanize_list(&extensions)
            },
            env!("CARGO_PKG_VERSION")
        ));

        msg.channel_id
            .say(&serenity_ctx.http, truncate_for_message(&output))
            .await?;
        Ok(())
    }

    async fn handle_shutdown(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        msg: &Message,
    ) -> Result<()> {
        require_owner(ctx, msg).await?;

        info!("Shutdown requested by {}", msg.author.id);
        msg.channel_id.say(&serenity_ctx.http, "Shutting down... 👋").await?;
        ctx.shutdown().await;
        Ok(())
    }
}

/// Compact uptime, omitting leading zero units
pub fn format_uptime(uptime: Duration) -> String {
    let days = uptime.as_secs() / 86400;
    let hours = (uptime.as_secs() % 86400) / 3600;
    let minutes = (uptime.as_secs() % 3600) / 60;
    let seconds = uptime.as_secs() % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utility_handler_commands() {
        let handler = UtilityHandler;
        let names = handler.command_names();

        assert!(names.contains(&"ping"));
        assert!(names.contains(&"info"));
        assert!(names.contains(&"uptime"));
        assert!(names.contains(&"shutdown"));
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(5)), "5s");
        assert_eq!(format_uptime(Duration::from_secs(65)), "1m 5s");
        assert_eq!(format_uptime(Duration::from_secs(3_600)), "1h 0m 0s");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d 1h 1m 1s");
    }
}
