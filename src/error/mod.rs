//! Error types for the signgate daemon.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
