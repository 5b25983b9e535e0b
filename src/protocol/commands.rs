//! Module `commands`
//!
//! Defines the commands a client can send and the result of running one.

/// A command parsed from a client line.
///
/// Paths are relative to the storage root; an empty path is the root.
#[derive(Debug, PartialEq)]
pub enum Command {
    /// List a directory
    LIST(String),
    /// Create directory `name` under `path`
    MKD { path: String, name: String },
    /// Delete directory `name` under `path`
    RMD {
        path: String,
        name: String,
        confirmed: bool,
    },
    /// Delete the named files under `path`
    DELE { path: String, names: Vec<String> },
    /// Download file or folder `name` under `path`
    RETR { path: String, name: String },
    /// Upload `size` bytes as `name` under `path`
    STOR {
        path: String,
        name: String,
        size: u64,
    },
    NOOP,
    QUIT,
    /// A known command with unusable arguments
    INVALID(String),
    UNKNOWN,
}

/// Represents the outcome status of executing a command.
#[derive(Debug, PartialEq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

/// A finished command: its status and the full reply text.
#[derive(Debug)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: String,
}

impl CommandResult {
    pub fn success(message: String) -> Self {
        Self {
            status: CommandStatus::Success,
            message,
        }
    }

    pub fn failure(reason: impl Into<String>, message: String) -> Self {
        Self {
            status: CommandStatus::Failure(reason.into()),
            message,
        }
    }
}
