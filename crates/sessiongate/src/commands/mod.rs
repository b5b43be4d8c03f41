//! Command handlers and dispatch.

pub mod check;
pub mod config_cmd;
pub mod providers;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a gate-backed command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Check(args) => check::handle(args, global).await,
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Providers(args) => providers::handle(args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled before dispatch".into(),
        }),
    }
}
