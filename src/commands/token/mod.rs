//! Bearer token lifecycle commands.
//!
//! Tokens are minted by `auth.login`; this module handles logout.

mod revoke;

pub use revoke::RevokeTokenCommand;
