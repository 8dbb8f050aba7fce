//! Prefix command handler trait
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 2.0.0: Handlers receive the parsed prefix invocation instead of an interaction
//! - 1.0.0: Initial implementation for modular command handling

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::sync::Arc;

use super::context::CommandContext;
use super::parser::Invocation;

/// Trait for prefix command handlers
///
/// Each handler processes one or more qualified command names such as
/// `"set bot username"`. Handlers are registered with a `CommandRegistry` and
/// dispatched on the name resolved from the message.
///
/// # Example
///
/// ```ignore
/// pub struct PingHandler;
///
/// #[async_trait]
/// impl MessageCommandHandler for PingHandler {
///     fn command_names(&self) -> &'static [&'static str] {
///         &["ping"]
///     }
///
///     async fn handle(
///         &self,
///         ctx: Arc<CommandContext>,
///         serenity_ctx: &Context,
///         msg: &Message,
///         invocation: &Invocation,
///     ) -> Result<()> {
///         msg.channel_id.say(&serenity_ctx.http, "Pong!").await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait MessageCommandHandler: Send + Sync {
    /// Qualified command name(s) this handler processes
    fn command_names(&self) -> &'static [&'static str];

    /// Handle one invocation
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared command context with the Core config and extensions
    /// * `serenity_ctx` - Serenity context for Discord API calls
    /// * `msg` - The message that invoked the command
    /// * `invocation` - Resolved command name, prefix and argument text
    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test that the trait is object-safe (can be used with dyn)
    fn _assert_object_safe(_: &dyn MessageCommandHandler) {}
}
