//! Process settings read from the environment
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Token is optional here; the bot falls back to the stored Core token
//! - 1.0.0: Initial environment-based settings

use anyhow::{anyhow, Result};
use serenity::model::id::UserId;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Gateway token; when unset the token stored in the Core config is used
    pub discord_token: Option<String>,
    /// Directory holding one settings subdirectory per config owner
    pub data_dir: PathBuf,
    pub log_level: String,
    /// Extensions loaded before connecting
    pub load_on_startup: Vec<String>,
    /// Overrides the application owner reported by Discord
    pub owner_id: Option<UserId>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let owner_id = match non_empty("DPYBOT_OWNER_ID") {
            Some(raw) => Some(UserId(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| anyhow!("DPYBOT_OWNER_ID must be a numeric user id: {e}"))?,
            )),
            None => None,
        };

        Ok(Self {
            discord_token: non_empty("DISCORD_TOKEN"),
            data_dir: non_empty("DPYBOT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            load_on_startup: non_empty("DPYBOT_LOAD_ON_STARTUP")
                .map(|raw| parse_list(&raw))
                .unwrap_or_default(),
            owner_id,
        })
    }
}

/// Split a comma-separated list, dropping blanks
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
