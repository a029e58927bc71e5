//! Unified error type for layerforge.
//!
//! All crates funnel their failures into [`Error`]. The variants mirror the
//! failure taxonomy of a batch run: validation problems and per-item action
//! failures are recoverable, conflict-resolution misconfiguration is fatal.

use std::fmt;
use std::path::{Path, PathBuf};

/// Unified error type covering all failure modes in layerforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "item", "command").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A setting value, command argument or filename failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A filesystem path could not be read or written due to permissions.
    #[error("Permission denied: {}: {source}", path.display())]
    Permission {
        /// The path that was being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Overwrite handling was configured in a way that cannot be honored,
    /// e.g. `ask` in a non-interactive run.
    #[error("Conflict resolution error: {0}")]
    ConflictResolution(String),

    /// A pipeline action failed for a single item.
    #[error("Action error [{command}]: {message}")]
    Action {
        /// Name of the command that failed.
        command: String,
        /// Human-readable error description.
        message: String,
    },

    /// Reading or writing the settings document failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The host application rejected a request.
    #[error("Host error: {0}")]
    Host(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The run was cancelled by the caller.
    #[error("Cancelled")]
    Cancelled,

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a run may continue after this error.
    ///
    /// Conflict-resolution misconfiguration and internal errors stop the run;
    /// everything else is scoped to an item, a setting or a file.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Error::ConflictResolution(_) | Error::Internal(_) | Error::Cancelled
        )
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Action`].
    pub fn action(command: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Action {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Host`].
    pub fn host(message: impl Into<String>) -> Self {
        Error::Host(message.into())
    }

    /// Map an I/O error at `path`, keeping permission failures distinct.
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Error::Permission {
                path: path.to_path_buf(),
                source,
            }
        } else {
            Error::Io { source }
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
