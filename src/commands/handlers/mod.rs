//! Per-command handler implementations
//!
//! - **Version**: 3.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 3.0.0: Prefix command handlers for the Core settings (bot profile, status, prefixes, extensions)
//! - 1.0.0: Initial extraction from monolithic command_handler.rs

pub mod bot_settings;
pub mod extensions;
pub mod prefix;
pub mod status;
pub mod utility;

use std::sync::Arc;

use super::handler::MessageCommandHandler;
use super::registry::CommandRegistry;

/// Create all built-in command handlers
///
/// Returns a vector of handlers ready to be registered with CommandRegistry.
pub fn create_all_handlers() -> Vec<Arc<dyn MessageCommandHandler>> {
    vec![
        Arc::new(utility::UtilityHandler),
        Arc::new(bot_settings::BotSettingsHandler),
        Arc::new(status::StatusHandler),
        Arc::new(prefix::PrefixHandler),
        Arc::new(extensions::ExtensionsHandler),
    ]
}

/// Registry holding every built-in command
pub fn core_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    for handler in create_all_handlers() {
        registry.register(handler);
    }
    registry
}
