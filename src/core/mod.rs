//! # Core Module
//!
//! Process settings and shared chat formatting for the bot.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Environment settings renamed to `Settings`; scoped storage moved to `config`
//! - 1.1.0: Add formatting helpers
//! - 1.0.0: Initial creation with settings module

pub mod formatting;
pub mod settings;

pub use formatting::{bold, humanize_list, inline, truncate_for_message, MESSAGE_LIMIT};
pub use settings::Settings;
