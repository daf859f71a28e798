//! Authentication core.
//!
//! Bearer token issuing and validation, revocation, nonce tracking, request
//! canonicalization, HMAC signature verification, and the gate composing
//! them into one decision per request.
//!
//! Revocations and nonces live in process memory only. A restart forgets
//! both: revoked tokens work again until their natural expiry, and a signed
//! request captured before the restart can be replayed inside its timestamp
//! window. Deployments needing stronger guarantees must back these stores
//! with shared durable storage.

pub mod canonical;
mod gate;
mod nonce;
mod revocation;
mod signature;
mod token;

use std::time::{SystemTime, UNIX_EPOCH};

pub use gate::{
    extract_bearer, AuthMode, Authenticated, AuthenticationGate, InboundRequest, RequestHeaders,
    SigningHeaders, SigningMode,
};
pub use nonce::{NonceLedger, DEFAULT_NONCE_TTL};
pub use revocation::RevocationSet;
pub use signature::{sign, SignatureVerifier, SignedEnvelope, DEFAULT_TIMESTAMP_WINDOW};
pub use token::{Claims, IssuedToken, TokenCodec, DEFAULT_TOKEN_TTL, MIN_KEY_LEN};

/// Current unix time in seconds; 0 if the clock is before the epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
