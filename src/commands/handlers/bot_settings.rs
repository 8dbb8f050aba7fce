//! Bot profile settings
//!
//! Handles: set bot description, set bot avatar, set bot avatar remove,
//! set bot username, set bot nickname, set bot custominfo
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 1.0.0: Initial release

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{info, warn};
use serenity::model::channel::Message;
use serenity::model::permissions::Permissions;
use serenity::model::user::UserPublicFlags;
use serenity::prelude::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::commands::checks::{require_admin_or, require_owner};
use crate::commands::context::{tick, CommandContext};
use crate::commands::error::CommandError;
use crate::commands::handler::MessageCommandHandler;
use crate::commands::parser::Invocation;

pub const DESCRIPTION_LIMIT: usize = 250;
pub const NAME_LIMIT: usize = 32;
pub const CUSTOM_INFO_LIMIT: usize = 1024;
const USERNAME_TIMEOUT: Duration = Duration::from_secs(30);

/// Reject `text` longer than `limit` characters with `message`
pub fn check_length(text: &str, limit: usize, message: &str) -> Result<()> {
    if text.chars().count() > limit {
        return Err(CommandError::BadArgument(message.to_string()).into());
    }
    Ok(())
}

/// `<https://x>` suppresses embeds in Discord; accept it as a plain URL
pub fn strip_angle_brackets(url: &str) -> &str {
    url.trim()
        .strip_prefix('<')
        .and_then(|u| u.strip_suffix('>'))
        .unwrap_or_else(|| url.trim())
}

/// MIME type of a PNG or JPEG image, from its magic bytes
pub fn image_mime(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else {
        None
    }
}

/// Data URI accepted by the profile edit endpoint
pub fn avatar_data_uri(data: &[u8]) -> Result<String> {
    let mime = image_mime(data)
        .ok_or_else(|| CommandError::BadArgument("JPG / PNG format only.".to_string()))?;
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(data)))
}

/// Handler for the `set bot` group
pub struct BotSettingsHandler;

#[async_trait]
impl MessageCommandHandler for BotSettingsHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &[
            "set bot description",
            "set bot avatar",
            "set bot avatar remove",
            "set bot username",
            "set bot nickname",
            "set bot custominfo",
        ]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
    ) -> Result<()> {
        match invocation.command.as_str() {
            "set bot description" => self.handle_description(&ctx, serenity_ctx, msg, invocation).await,
            "set bot avatar" => self.handle_avatar(&ctx, serenity_ctx, msg, invocation).await,
            "set bot avatar remove" => self.handle_avatar_remove(&ctx, serenity_ctx, msg).await,
            "set bot username" => self.handle_username(&ctx, serenity_ctx, msg, invocation).await,
            "set bot nickname" => self.handle_nickname(&ctx, serenity_ctx, msg, invocation).await,
            "set bot custominfo" => self.handle_custom_info(&ctx, serenity_ctx, msg, invocation).await,
            _ => Ok(()),
        }
    }
}

impl BotSettingsHandler {
    async fn handle_description(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
    ) -> Result<()> {
        require_owner(ctx, msg).await?;
        let entry = ctx.config.global().entry("description");

        let reply = match invocation.args() {
            "" => {
                entry.clear().await?;
                "Description reset."
            }
            text => {
                check_length(
                    text,
                    DESCRIPTION_LIMIT,
                    "The description must be 250 characters or fewer.",
                )?;
                entry.set(text).await?;
                "Description set."
            }
        };

        tick(serenity_ctx, msg, true, Some(reply)).await
    }

    async fn handle_avatar(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
    ) -> Result<()> {
        require_owner(ctx, msg).await?;

        let data = if let Some(attachment) = msg.attachments.first() {
            attachment.download().await?
        } else if !invocation.args().is_empty() {
            let url = strip_angle_brackets(invocation.args());
            let response = ctx.http_client.get(url).send().await;
            match response.and_then(|r| r.error_for_status()) {
                Ok(response) => response.bytes().await?.to_vec(),
                Err(e) => {
                    warn!("Avatar download from {url} failed: {e}");
                    return Err(CommandError::BadArgument(
                        "Could not download that image.".to_string(),
                    )
                    .into());
                }
            }
        } else {
            return Err(CommandError::MissingArgument {
                usage: "set bot avatar [url] (or attach an image)",
            }
            .into());
        };

        let data_uri = avatar_data_uri(&data)?;
        let mut user = serenity_ctx.cache.current_user();
        match user
            .edit(&serenity_ctx.http, |profile| profile.avatar(Some(&data_uri)))
            .await
        {
            Ok(()) => {
                info!("🖼️ Avatar changed by {}", msg.author.id);
                tick(serenity_ctx, msg, true, Some("Done.")).await
            }
            Err(e) => {
                warn!("Avatar change failed: {e}");
                msg.channel_id
                    .say(
                        &serenity_ctx.http,
                        "Failed. Remember that you can edit my avatar up to two times an hour. \
                         The URL or attachment must be a valid image in either JPG or PNG format.",
                    )
                    .await?;
                Ok(())
            }
        }
    }

    async fn handle_avatar_remove(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        msg: &Message,
    ) -> Result<()> {
        require_owner(ctx, msg).await?;

        let mut user = serenity_ctx.cache.current_user();
        user.edit(&serenity_ctx.http, |profile| profile.avatar(None))
            .await?;
        tick(serenity_ctx, msg, true, Some("Avatar removed.")).await
    }

    async fn handle_username(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
    ) -> Result<()> {
        require_owner(ctx, msg).await?;

        let username = invocation.args();
        if username.is_empty() {
            return Err(CommandError::MissingArgument {
                usage: "set bot username <username>",
            }
            .into());
        }
        check_length(
            username,
            NAME_LIMIT,
            "Failed to change name. Must be 32 characters or fewer.",
        )?;

        let mut user = serenity_ctx.cache.current_user();
        let verified = user
            .public_flags
            .map(|flags| flags.contains(UserPublicFlags::VERIFIED_BOT))
            .unwrap_or(false);
        if verified {
            msg.channel_id
                .say(
                    &serenity_ctx.http,
                    "The username of a verified bot cannot be manually changed. \
                     Please contact Discord support to change it.",
                )
                .await?;
            return Ok(());
        }

        let edit = user.edit(&serenity_ctx.http, |profile| profile.username(username));
        let reply = match timeout(USERNAME_TIMEOUT, edit).await {
            Ok(Ok(())) => {
                info!("🏷️ Username changed to {username}");
                return tick(serenity_ctx, msg, true, Some("Done.")).await;
            }
            Ok(Err(e)) => {
                warn!("Username change failed: {e}");
                "Failed to change name. Remember that you can only do it up to 2 times an hour. \
                 Use nicknames if you need frequent changes."
            }
            Err(_) => {
                warn!("Username change timed out");
                "Changing the username timed out. Remember that you can only do it up to 2 times \
                 an hour. Use nicknames if you need frequent changes."
            }
        };
        msg.channel_id.say(&serenity_ctx.http, reply).await?;
        Ok(())
    }

    async fn handle_nickname(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
    ) -> Result<()> {
        let guild_id =
            require_admin_or(ctx, serenity_ctx, msg, Permissions::MANAGE_NICKNAMES).await?;

        let nickname = match invocation.args() {
            "" => None,
            nick => {
                check_length(
                    nick,
                    NAME_LIMIT,
                    "Failed to change nickname. Must be 32 characters or fewer.",
                )?;
                Some(nick)
            }
        };

        match guild_id.edit_nickname(&serenity_ctx.http, nickname).await {
            Ok(()) => tick(serenity_ctx, msg, true, Some("Done.")).await,
            Err(e) => {
                warn!("Nickname change in {guild_id} failed: {e}");
                msg.channel_id
                    .say(
                        &serenity_ctx.http,
                        "I lack the permissions to change my own nickname.",
                    )
                    .await?;
                Ok(())
            }
        }
    }

    async fn handle_custom_info(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
    ) -> Result<()> {
        require_owner(ctx, msg).await?;
        let entry = ctx.config.global().entry("custom_info");

        let reply = match invocation.args() {
            "" => {
                entry.clear().await?;
                "Custom info cleared."
            }
            text => {
                check_length(
                    text,
                    CUSTOM_INFO_LIMIT,
                    "Text must be fewer than 1024 characters long.",
                )?;
                entry.set(text).await?;
                "Custom info set."
            }
        };

        tick(serenity_ctx, msg, true, Some(reply)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bad_argument(result: Result<()>) -> String {
        match result.unwrap_err().downcast::<CommandError>() {
            Ok(CommandError::BadArgument(message)) => message,
            other => panic!("expected BadArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_bot_settings_commands() {
        let names = BotSettingsHandler.command_names();
        assert_eq!(names.len(), 6);
        assert!(names.contains(&"set bot avatar remove"));
        assert!(names.contains(&"set bot custominfo"));
    }

    #[test]
    fn test_check_length_counts_characters() {
        assert!(check_length(&"a".repeat(250), DESCRIPTION_LIMIT, "too long").is_ok());
        assert_eq!(
            bad_argument(check_length(&"a".repeat(251), DESCRIPTION_LIMIT, "too long")),
            "too long"
        );
        // 32 multi-byte characters fit a 32 character limit
        assert!(check_length(&"é".repeat(32), NAME_LIMIT, "too long").is_ok());
        assert!(check_length(&"é".repeat(33), NAME_LIMIT, "too long").is_err());
    }

    #[test]
    fn test_strip_angle_brackets() {
        assert_eq!(strip_angle_brackets("<https://x/a.png>"), "https://x/a.png");
        assert_eq!(strip_angle_brackets(" https://x/a.png "), "https://x/a.png");
        assert_eq!(strip_angle_brackets("<https://x/a.png"), "<https://x/a.png");
    }

    #[test]
    fn test_image_mime() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0];

        assert_eq!(image_mime(&png), Some("image/png"));
        assert_eq!(image_mime(&jpeg), Some("image/jpeg"));
        assert_eq!(image_mime(b"GIF89a"), None);
        assert_eq!(image_mime(&[]), None);
    }

    #[test]
    fn test_avatar_data_uri() {
        let jpeg = [0xFF, 0xD8, 0xFF];
        assert_eq!(avatar_data_uri(&jpeg).unwrap(), "data:image/jpeg;base64,/9j/");

        let err = avatar_data_uri(b"GIF89a").unwrap_err();
        assert_eq!(err.to_string(), "JPG / PNG format only.");
    }
}
