use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Errors surfaced by pipkin operations.
///
/// Variants carry owned data so results can be cloned and reported after the
/// fact (e.g. per-spec summaries in the CLI).
#[derive(Debug, Clone, ThisError)]
pub enum Error {
    #[error("'{name}' is not installed")]
    NotInstalled { name: String },

    #[error("'{name}' is already installed (pass --force to reinstall)")]
    AlreadyInstalled { name: String },

    #[error("virtual environment '{name}' does not exist")]
    MissingVenv { name: String },

    #[error("virtual environment '{name}' has no pipkin metadata; uninstall and reinstall it")]
    MissingMetadata { name: String },

    #[error("invalid package spec '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },

    #[error("failed to create virtual environment: {message}")]
    VenvCreation { message: String },

    #[error("pip failed ({status})")]
    PipFailed { status: String, tail: Vec<String> },

    #[error("app link conflicts with existing file: {}", path.display())]
    LinkConflict { path: PathBuf },

    #[error("{message}")]
    Environment { message: String },
}

impl Error {
    /// Wrap an I/O-level failure with context into the catch-all variant.
    pub fn environment(context: &str, err: impl std::fmt::Display) -> Self {
        Error::Environment {
            message: format!("{context}: {err}"),
        }
    }
}
