//! Reply handling
//!
//! Reply codes and formatting. Each storage error kind has a code and token
//! of its own so clients can branch on the cause.

use crate::error::{ErrorKind, StorageError};

pub const OPENING_DATA: u16 = 150;
pub const OK: u16 = 200;
pub const GOODBYE: u16 = 221;
pub const READY: u16 = 220;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const ACTION_COMPLETE: u16 = 250;
pub const PARTIALLY_COMPLETE: u16 = 251;
pub const DIRECTORY_CREATED: u16 = 257;
pub const CONFIRMATION_REQUIRED: u16 = 350;
pub const TOO_MANY_CONNECTIONS: u16 = 421;
pub const ACTION_NOT_TAKEN: u16 = 450;
pub const LOCAL_ERROR: u16 = 451;
pub const UNKNOWN_COMMAND: u16 = 500;
pub const SYNTAX_ERROR: u16 = 501;
pub const ALREADY_EXISTS: u16 = 521;
pub const NAME_CONFLICT: u16 = 522;
pub const NOT_FOUND: u16 = 550;
pub const EXCEEDED_STORAGE: u16 = 552;
pub const ACCESS_DENIED: u16 = 553;

/// Reply code for a storage error kind
pub fn reply_code(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::AccessDenied => ACCESS_DENIED,
        ErrorKind::NotFound => NOT_FOUND,
        ErrorKind::AlreadyExists => ALREADY_EXISTS,
        ErrorKind::NameConflict => NAME_CONFLICT,
        ErrorKind::ConfirmationRequired => CONFIRMATION_REQUIRED,
        ErrorKind::IoFailure => LOCAL_ERROR,
    }
}

/// Format a reply line
pub fn format_response(code: u16, message: &str) -> String {
    format!("{code} {message}\r\n")
}

/// `<code> <TOKEN> <message>` for a storage error
pub fn error_response(err: &StorageError) -> String {
    let kind = err.kind();
    format!("{} {} {}\r\n", reply_code(kind), kind.as_str(), err)
}
