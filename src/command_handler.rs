//! Message dispatcher
//!
//! Every incoming message first runs the loaded extensions' hooks, then is
//! matched against the prefixes valid where it was sent. Commands resolve
//! against the built-in registry and then each loaded extension's registry.
//!
//! - **Version**: 4.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 4.0.0: Prefix commands from the Core config; extension registries
//! - 1.0.0: Initial message handler

use anyhow::Result;
use log::{debug, error, info, warn};
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::sync::Arc;
use uuid::Uuid;

use crate::commands::context::CommandContext;
use crate::commands::error::CommandError;
use crate::commands::handlers::core_registry;
use crate::commands::parser::{find_prefix, parse_invocation, Invocation, PrefixMatch};
use crate::commands::registry::{CommandRegistry, Resolved, Target};
use crate::core::{humanize_list, inline};

/// A command found in one of the registries
pub struct Dispatch {
    pub invocation: Invocation,
    pub resolved: Resolved,
    pub registry: Arc<CommandRegistry>,
}

/// Pick the best resolution across `registries`.
///
/// The longest name wins, a command beats a group of the same length, and
/// earlier registries win ties.
pub fn resolve_in(matched: &PrefixMatch<'_>, registries: &[Arc<CommandRegistry>]) -> Option<Dispatch> {
    let mut best: Option<Dispatch> = None;

    for registry in registries {
        let Some((invocation, resolved)) = parse_invocation(matched, registry) else {
            continue;
        };
        let rank = |r: &Resolved| (r.consumed, matches!(r.target, Target::Command(_)));
        let better = match &best {
            Some(current) => rank(&resolved) > rank(&current.resolved),
            None => true,
        };
        if better {
            best = Some(Dispatch {
                invocation,
                resolved,
                registry: Arc::clone(registry),
            });
        }
    }

    best
}

/// Text listing what follows a group name
pub fn group_listing(invocation: &Invocation, registry: &CommandRegistry) -> String {
    let subcommands = registry.subcommands(&invocation.command);
    format!(
        "{} subcommands: {}",
        inline(&invocation.qualified()),
        humanize_list(&subcommands)
    )
}

#[derive(Clone)]
pub struct CommandHandler {
    ctx: Arc<CommandContext>,
    registry: Arc<CommandRegistry>,
}

impl CommandHandler {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self {
            ctx,
            registry: Arc::new(core_registry()),
        }
    }

    pub fn context(&self) -> &Arc<CommandContext> {
        &self.ctx
    }

    pub async fn handle_message(&self, serenity_ctx: &Context, msg: &Message) -> Result<()> {
        if msg.author.bot {
            return Ok(());
        }

        let request_id = Uuid::new_v4();
        debug!(
            "[{}] 📥 Message received | User: {} | Channel: {} | Guild: {}",
            request_id,
            msg.author.id,
            msg.channel_id,
            msg.guild_id.map(|id| id.to_string()).unwrap_or_else(|| "DM".to_string())
        );

        self.ctx.extensions.dispatch_message(serenity_ctx, msg).await;

        let Some(identity) = self.ctx.identity().await else {
            debug!("[{request_id}] ℹ️ Not ready, ignoring message");
            return Ok(());
        };

        let prefixes = self.ctx.prefixes_for(msg.guild_id).await?;
        let Some(matched) = find_prefix(&msg.content, &prefixes, identity.id) else {
            return Ok(());
        };

        let mut registries = vec![Arc::clone(&self.registry)];
        registries.extend(
            self.ctx
                .extensions
                .registries()
                .await
                .into_iter()
                .map(|(_, registry)| registry),
        );

        let Some(dispatch) = resolve_in(&matched, &registries) else {
            debug!("[{request_id}] ℹ️ No command matched after prefix {:?}", matched.prefix);
            return Ok(());
        };

        let invocation = &dispatch.invocation;
        info!(
            "[{request_id}] 🎯 {} invoked by {}",
            invocation.command, msg.author.id
        );

        let result = match &dispatch.resolved.target {
            Target::Command(handler) => {
                handler
                    .handle(Arc::clone(&self.ctx), serenity_ctx, msg, invocation)
                    .await
            }
            Target::Group => msg
                .channel_id
                .say(&serenity_ctx.http, group_listing(invocation, &dispatch.registry))
                .await
                .map(|_| ())
                .map_err(Into::into),
        };

        self.report(request_id, serenity_ctx, msg, invocation, result)
            .await
    }

    /// Tell the user about a failed command where that helps, log the rest
    async fn report(
        &self,
        request_id: Uuid,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
        result: Result<()>,
    ) -> Result<()> {
        let e = match result {
            Ok(()) => {
                debug!("[{request_id}] ✅ {} completed", invocation.command);
                return Ok(());
            }
            Err(e) => e,
        };

        let reply = match e.downcast_ref::<CommandError>() {
            Some(CommandError::MissingArgument { usage }) => {
                format!("Usage: {}", inline(&format!("{}{usage}", invocation.prefix)))
            }
            Some(CommandError::BadArgument(message)) => message.clone(),
            Some(CommandError::CheckFailed(reason)) => {
                warn!(
                    "[{request_id}] 🚫 {} refused for {}: {reason}",
                    invocation.command, msg.author.id
                );
                return Ok(());
            }
            None => {
                error!("[{request_id}] ❌ {} failed: {e:#}", invocation.command);
                format!(
                    "Error in command {}. Check your console or logs for details.",
                    inline(&invocation.command)
                )
            }
        };

        msg.channel_id.say(&serenity_ctx.http, reply).await?;
        Ok(())
    }
}
