//! Command failures reported back to the invoking user
//!
//! Handlers return these through `anyhow`; the dispatcher downcasts them to
//! decide whether to answer in chat or only log.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    /// A required argument is missing; the usage line is shown
    #[error("missing argument, usage: {usage}")]
    MissingArgument { usage: &'static str },

    /// An argument was present but unusable; the message is shown as-is
    #[error("{0}")]
    BadArgument(String),

    /// The invoker may not run this command here; logged only
    #[error("check failed: {0}")]
    CheckFailed(&'static str),
}
