//! RAX Drive Server
//!
//! A sandboxed file store: clients list, create, delete, upload and
//! download entries below one storage root, and nothing outside it.

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod storage;

pub use server::Server;
pub use storage::Storage;
