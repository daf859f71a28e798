//! Command handlers module.
//!
//! Contains the command registry and every operation exposed on the socket.
//!
//! ## Adding a New Command
//!
//! 1. Create a new file in the appropriate subdirectory (e.g., `token/`)
//! 2. Implement the `Command` trait
//! 3. Register the command in `CommandRegistry::new()`

mod registry;
mod traits;
mod types;

pub mod auth;
pub mod principal;
pub mod system;
pub mod token;

pub use registry::{CommandRegistry, GateServices};
pub use traits::Command;
pub use types::{CommandOutput, CommandParams, ExecutionContext};
