//! Error handling
//!
//! Defines the storage error taxonomy shared by every operation.

pub mod types;

pub use types::*;
