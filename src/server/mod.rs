//! Server core functionality
//!
//! The accept loop and the per-connection session.

pub mod core;
pub mod session;

pub use core::Server;
