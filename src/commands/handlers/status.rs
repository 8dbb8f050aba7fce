//! Presence commands
//!
//! Handles: set status <activity> and set status <online status>
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 1.1.0: Refuse while the bot is in no guild
//! - 1.0.0: Initial release

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serenity::model::channel::Message;
use serenity::model::gateway::Activity;
use serenity::model::user::OnlineStatus;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::checks::{require_bot_in_guild, require_owner};
use crate::commands::context::CommandContext;
use crate::commands::error::CommandError;
use crate::commands::handler::MessageCommandHandler;
use crate::commands::parser::Invocation;
use crate::commands::handlers::bot_settings::check_length;
use crate::core::inline;

pub const TITLE_LIMIT: usize = 128;
pub const STREAMER_LIMIT: usize = 511;
const TWITCH_URL: &str = "https://www.twitch.tv/";

/// Activity for `kind` built from the command arguments.
///
/// Empty arguments clear the activity.
pub fn build_activity(kind: &str, args: &str) -> Result<Option<Activity>> {
    if args.is_empty() {
        return Ok(None);
    }

    if kind == "streaming" {
        let (streamer, title) = match args.split_once(char::is_whitespace) {
            Some((streamer, title)) if !title.trim().is_empty() => (streamer, title.trim()),
            _ => {
                return Err(CommandError::MissingArgument {
                    usage: "set status streaming <streamer> <title>",
                }
                .into())
            }
        };

        let url = if streamer.contains("twitch.tv/") {
            streamer.to_string()
        } else {
            format!("{TWITCH_URL}{streamer}")
        };
        check_length(
            &url,
            STREAMER_LIMIT,
            "The maximum length of the streamer url is 511 characters.",
        )?;
        check_length(
            title,
            TITLE_LIMIT,
            "The maximum length of the stream title is 128 characters.",
        )?;
        if reqwest::Url::parse(&url).is_err() {
            return Err(CommandError::BadArgument(format!("{} is not a valid URL.", inline(&url))).into());
        }
        return Ok(Some(Activity::streaming(title, url)));
    }

    check_length(
        args,
        TITLE_LIMIT,
        "The maximum length of activity descriptions is 128 characters.",
    )?;
    let activity = match kind {
        "playing" => Activity::playing(args),
        "listening" => Activity::listening(args),
        "watching" => Activity::watching(args),
        "competing" => Activity::competing(args),
        other => return Err(CommandError::BadArgument(format!("Unknown activity {other}.")).into()),
    };
    Ok(Some(activity))
}

pub fn online_status(name: &str) -> Option<OnlineStatus> {
    match name {
        "online" => Some(OnlineStatus::Online),
        "dnd" => Some(OnlineStatus::DoNotDisturb),
        "idle" => Some(OnlineStatus::Idle),
        "invisible" => Some(OnlineStatus::Invisible),
        _ => None,
    }
}

/// Handler for the `set status` group
pub struct StatusHandler;

#[async_trait]
impl MessageCommandHandler for StatusHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &[
            "set status streaming",
            "set status playing",
            "set status listening",
            "set status watching",
            "set status competing",
            "set status online",
            "set status dnd",
            "set status idle",
            "set status invisible",
        ]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
    ) -> Result<()> {
        require_bot_in_guild(serenity_ctx)?;
        require_owner(&ctx, msg).await?;

        let kind = invocation
            .command
            .rsplit(' ')
            .next()
            .unwrap_or_default();
        let (activity, status) = ctx.presence().await;

        let reply = if let Some(new_status) = online_status(kind) {
            ctx.set_presence(serenity_ctx, activity, new_status).await;
            format!("Status changed to {}.", inline(kind))
        } else {
            let new_activity = build_activity(kind, invocation.args())?;
            let reply = match &new_activity {
                Some(activity) => format!("Status set to {} {}.", kind, inline(&activity.name)),
                None => "Activity cleared.".to_string(),
            };
            ctx.set_presence(serenity_ctx, new_activity, status).await;
            reply
        };

        info!("Presence changed by {}: {reply}", msg.author.id);
        msg.channel_id.say(&serenity_ctx.http, reply).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::model::gateway::ActivityType;

    #[test]
    fn test_build_activity_kinds() {
        let activity = build_activity("playing", "chess").unwrap().unwrap();
        assert_eq!(activity.kind, ActivityType::Playing);
        assert_eq!(activity.name, "chess");

        let activity = build_activity("listening", "jazz radio").unwrap().unwrap();
        assert_eq!(activity.kind, ActivityType::Listening);
        assert_eq!(activity.name, "jazz radio");

        let activity = build_activity("watching", "you").unwrap().unwrap();
        assert_eq!(activity.kind, ActivityType::Watching);

        let activity = build_activity("competing", "a cup").unwrap().unwrap();
        assert_eq!(activity.kind, ActivityType::Competing);
    }

    #[test]
    fn test_build_activity_empty_clears() {
        assert!(build_activity("playing", "").unwrap().is_none());
        assert!(build_activity("streaming", "").unwrap().is_none());
    }

    #[test]
    fn test_build_activity_title_limit() {
        assert!(build_activity("playing", &"a".repeat(128)).is_ok());
        assert!(build_activity("playing", &"a".repeat(129)).is_err());
    }

    #[test]
    fn test_build_streaming_activity() {
        let activity = build_activity("streaming", "redbot Cooking live")
            .unwrap()
            .unwrap();
        assert_eq!(activity.kind, ActivityType::Streaming);
        assert_eq!(activity.name, "Cooking live");
        assert_eq!(
            activity.url.map(|url| url.to_string()),
            Some("https://www.twitch.tv/redbot".to_string())
        );

        let activity = build_activity("streaming", "https://twitch.tv/redbot Live")
            .unwrap()
            .unwrap();
        assert_eq!(
            activity.url.map(|url| url.to_string()),
            Some("https://twitch.tv/redbot".to_string())
        );
    }

    #[test]
    fn test_build_streaming_requires_title() {
        let err = build_activity("streaming", "redbot").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommandError>(),
            Some(CommandError::MissingArgument { .. })
        ));

        let long_streamer = "a".repeat(500);
        assert!(build_activity("streaming", &format!("{long_streamer} title")).is_err());
    }

    #[test]
    fn test_online_status() {
        assert_eq!(online_status("dnd"), Some(OnlineStatus::DoNotDisturb));
        assert_eq!(online_status("invisible"), Some(OnlineStatus::Invisible));
        assert_eq!(online_status("playing"), None);
    }
}
