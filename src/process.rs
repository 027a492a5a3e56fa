//! Blocking execution of external commands.

use anyhow::{anyhow, Result};
use std::process::Command;
use tracing::debug;

use crate::error::PkiError;

/// Render a command line for logs and error messages.
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `program` with `args`, inheriting stdio, and wait for it.
///
/// A non-zero exit becomes [`PkiError::CommandFailed`] carrying the exit
/// status (-1 when the process was killed by a signal).
pub fn run(program: &str, args: &[String]) -> Result<()> {
    let line = display_command(program, args);
    debug!(command = %line, "Running external command");

    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| anyhow!("Failed to start `{}`: {}", program, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(PkiError::CommandFailed {
            command: line,
            code: status.code().unwrap_or(-1),
        }
        .into())
    }
}
