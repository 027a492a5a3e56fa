//! Failure kinds that decide the process exit code.
//!
//! Everything else travels as a plain `anyhow::Error` and exits with status 1.
//! These variants are wrapped inside `anyhow::Error` as well; `main` downcasts
//! to recover them.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PkiError {
    #[error("Invalid choice: {0:?} (expected 1-8)")]
    InvalidChoice(String),

    #[error("Certificate verification failed for {subject}: {reason}")]
    VerificationFailed { subject: String, reason: String },

    #[error("`{command}` exited with status {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("Source file not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Refusing to overwrite existing file: {}", .0.display())]
    AlreadyExists(PathBuf),
}

impl PkiError {
    /// Exit status for this failure.
    ///
    /// A failed external command propagates its own status; a command killed
    /// by a signal is recorded with code -1 and maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            PkiError::CommandFailed { code, .. } if *code > 0 => *code,
            _ => 1,
        }
    }
}

/// Exit status for any error produced by this crate.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PkiError>())
        .map(PkiError::exit_code)
        .unwrap_or(1)
}
