//! Error types
//!
//! Every storage failure carries a stable [`ErrorKind`] so callers branch on
//! the cause instead of parsing the message.

use std::fmt;
use std::io;

use thiserror::Error;

/// Machine-checkable cause of a storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The resolved path escapes the storage root.
    AccessDenied,
    /// The target is absent or of the wrong kind.
    NotFound,
    /// A directory with the requested name already exists.
    AlreadyExists,
    /// The requested name is taken by an entry of the other kind.
    NameConflict,
    /// A non-empty directory was deleted without confirmation.
    ConfirmationRequired,
    /// The underlying filesystem call failed.
    IoFailure,
}

impl ErrorKind {
    /// Stable token used on the wire and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AccessDenied => "ACCESS_DENIED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::NameConflict => "NAME_CONFLICT",
            ErrorKind::ConfirmationRequired => "CONFIRMATION_REQUIRED",
            ErrorKind::IoFailure => "IO_FAILURE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage module errors
///
/// Paths in messages are virtual (root-relative) paths, never host paths.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Directory already exists: {0}")]
    AlreadyExists(String),

    #[error("Name is already used by a file: {0}")]
    NameConflict(String),

    #[error("Directory is not empty, confirmation required: {0}")]
    ConfirmationRequired(String),

    #[error("I/O failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Wraps an I/O error together with the virtual path it happened on.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::AccessDenied(_) => ErrorKind::AccessDenied,
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            StorageError::NameConflict(_) => ErrorKind::NameConflict,
            StorageError::ConfirmationRequired(_) => ErrorKind::ConfirmationRequired,
            StorageError::Io { .. } => ErrorKind::IoFailure,
        }
    }
}

/// Server startup errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Failed to open storage root: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
}
