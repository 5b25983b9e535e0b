//! Command protocol
//!
//! Parses command lines, runs them against [`Storage`](crate::storage::Storage)
//! and formats the replies.

pub mod commands;
pub mod handlers;
pub mod parser;
pub mod responses;

pub use commands::{Command, CommandResult, CommandStatus};
pub use handlers::handle_command;
pub use parser::parse_command;
