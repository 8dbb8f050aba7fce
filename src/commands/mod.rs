//! # Command System
//!
//! Prefix command handling for Discord messages.
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.0.0: Prefix commands with qualified names, groups and aliases replace slash commands
//! - 2.1.0: Add modular handler infrastructure (handler trait, context, registry)
//! - 1.0.0: Initial reorganization with modular command structure

pub mod checks;
pub mod context;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod parser;
pub mod registry;

// Re-export the CommandHandler from the handler module
pub use crate::command_handler::CommandHandler;

// Re-export handler infrastructure
pub use context::CommandContext;
pub use error::CommandError;
pub use handler::MessageCommandHandler;
pub use parser::Invocation;
pub use registry::CommandRegistry;
