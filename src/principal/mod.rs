//! Principal directory.
//!
//! The gate never owns identity records; it resolves them through the
//! [`PrincipalStore`] trait. [`MemoryPrincipalStore`] is the in-process
//! implementation used by the daemon and the tests.

pub mod password;
mod store;

use std::fmt;
use std::str::FromStr;

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

use crate::error::{GateError, ValidationErrorKind};

pub use store::MemoryPrincipalStore;

/// Unique principal identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub u64);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PrincipalId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(PrincipalId)
    }
}

/// Principal role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Standard,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Standard => "standard",
            Role::Administrator => "administrator",
        }
    }
}

impl FromStr for Role {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Role::Standard),
            "administrator" => Ok(Role::Administrator),
            other => Err(GateError::Validation {
                kind: ValidationErrorKind::InvalidParameter {
                    param: "role".to_string(),
                    message: format!("unknown role '{}'", other),
                },
            }),
        }
    }
}

/// Per-principal signing secret.
///
/// Hex text of 32 random bytes. The hex string itself is the HMAC key, since
/// that is the exact value handed to the client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalSecret(String);

/// Number of random bytes behind a generated secret.
pub const SECRET_BYTES: usize = 32;

impl PrincipalSecret {
    /// Generate a fresh secret from the system CSPRNG.
    pub fn generate() -> Result<Self, GateError> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; SECRET_BYTES];
        rng.fill(&mut bytes).map_err(|_| GateError::Command {
            kind: crate::error::CommandErrorKind::ExecutionFailed {
                message: "system random source unavailable".to_string(),
            },
        })?;
        Ok(Self(hex::encode(bytes)))
    }

    /// Wrap an existing secret (seeded from configuration).
    pub fn from_string(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key bytes for the keyed hash.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for PrincipalSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrincipalSecret([REDACTED])")
    }
}

/// An identity with its signing secret and role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub secret: PrincipalSecret,
    pub role: Role,
}

impl Principal {
    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }
}

/// Identity lookups the gate depends on.
///
/// Implementations may block on an external store; the gate calls them from
/// a blocking context and performs no retries.
pub trait PrincipalStore: Send + Sync {
    /// Resolve a principal by id.
    fn lookup_by_id(&self, id: PrincipalId) -> Option<Principal>;

    /// Resolve a principal by its signing secret.
    fn lookup_by_api_key(&self, secret: &str) -> Option<Principal>;
}
