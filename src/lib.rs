//! signgate
//!
//! Request authentication core: bearer tokens with expiry and revocation,
//! optional HMAC-SHA256 request signing with a timestamp window and a nonce
//! ledger against replay. The `signgate` binary hosts the core as a
//! forward-auth sidecar on a Unix socket.

pub mod audit;
pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod principal;
pub mod protocol;
pub mod socket;
