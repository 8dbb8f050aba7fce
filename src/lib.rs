// Core layer - process settings and chat formatting
pub mod core;

// Scoped persistent configuration
pub mod config;

// Loadable extensions
pub mod extensions;

// Application layer
pub mod command_handler;
pub mod commands;

pub use crate::config::{Config, ConfigContext, ConfigError};
pub use crate::core::Settings;
