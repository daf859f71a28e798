//! Bearer token issuing and validation.
//!
//! Tokens are HS256 JWTs carrying `sub` (principal id), `iat` and `exp`.
//! Expiry is checked here against an explicit clock rather than by the JWT
//! library so the boundary is exact.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthErrorKind, CommandErrorKind, GateError};
use crate::principal::PrincipalId;

use super::{unix_now, RevocationSet};

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Minimum accepted length of the token signing key.
pub const MIN_KEY_LEN: usize = 32;

/// Claims embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

/// Issues and validates self-contained bearer tokens.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
    revoked: Arc<RevocationSet>,
}

impl TokenCodec {
    /// Create a codec from the process-wide symmetric key.
    pub fn new(key: &[u8], default_ttl: Duration, revoked: Arc<RevocationSet>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            validation,
            default_ttl,
            revoked,
        }
    }

    /// Load the token signing key from a file.
    ///
    /// The file must be readable by its owner only and hold at least
    /// [`MIN_KEY_LEN`] bytes.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the key file
    ///
    /// # Errors
    ///
    /// Returns `GateError::Config` if:
    /// - The file cannot be read or its metadata inspected
    /// - The file is group- or world-accessible
    /// - The key is shorter than [`MIN_KEY_LEN`] bytes
    pub fn load_key(path: &Path) -> Result<Vec<u8>, GateError> {
        let metadata = std::fs::metadata(path).map_err(|e| GateError::Config {
            message: format!(
                "Failed to read token key metadata from {}: {}",
                path.display(),
                e
            ),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = metadata.permissions().mode();
            if mode & 0o077 != 0 {
                return Err(GateError::Config {
                    message: format!(
                        "Token key file {} has insecure permissions {:04o}, expected 0600 or 0400",
                        path.display(),
                        mode & 0o777
                    ),
                });
            }
        }
        #[cfg(not(unix))]
        let _ = metadata;

        let key = std::fs::read(path).map_err(|e| GateError::Config {
            message: format!("Failed to read token key from {}: {}", path.display(), e),
        })?;

        if key.len() < MIN_KEY_LEN {
            return Err(GateError::Config {
                message: format!(
                    "Token key in {} is {} bytes, need at least {}",
                    path.display(),
                    key.len(),
                    MIN_KEY_LEN
                ),
            });
        }

        Ok(key)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token for `subject`, valid for `ttl` (or the default) from now.
    pub fn issue(
        &self,
        subject: PrincipalId,
        ttl: Option<Duration>,
    ) -> Result<IssuedToken, GateError> {
        self.issue_at(subject, ttl, unix_now())
    }

    /// Issue a token as of `now` (unix seconds).
    ///
    /// # Arguments
    ///
    /// * `subject` - Principal the token identifies
    /// * `ttl` - Lifetime override; the codec default when `None`
    /// * `now` - Issue time, recorded as `iat`
    ///
    /// # Errors
    ///
    /// Returns `GateError::Command` if the claims cannot be signed.
    pub fn issue_at(
        &self,
        subject: PrincipalId,
        ttl: Option<Duration>,
        now: u64,
    ) -> Result<IssuedToken, GateError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(ttl.as_secs()),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| GateError::Command {
                kind: CommandErrorKind::ExecutionFailed {
                    message: format!("Failed to encode token: {}", e),
                },
            })?;

        debug!(principal_id = %subject, expires_at = claims.exp, "Token issued");

        Ok(IssuedToken {
            token,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    /// Validate a token against the current time.
    pub fn decode(&self, token: &str) -> Result<PrincipalId, AuthErrorKind> {
        self.decode_at(token, unix_now())
    }

    /// Validate a token as of `now` and return its subject.
    ///
    /// Integrity is checked first, then expiry (`now > exp`), then revocation.
    ///
    /// # Errors
    ///
    /// `TokenMalformed`, `TokenExpired` or `TokenRevoked`, in that order of
    /// precedence.
    pub fn decode_at(&self, token: &str, now: u64) -> Result<PrincipalId, AuthErrorKind> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "Token failed integrity check");
                AuthErrorKind::TokenMalformed
            })?;

        let subject: PrincipalId = data
            .claims
            .sub
            .parse()
            .map_err(|_| AuthErrorKind::TokenMalformed)?;

        if now > data.claims.exp {
            return Err(AuthErrorKind::TokenExpired);
        }

        if self.revoked.is_revoked(token) {
            return Err(AuthErrorKind::TokenRevoked);
        }

        Ok(subject)
    }

    /// Revoke a token. Idempotent; returns `false` if already revoked.
    pub fn revoke(&self, token: &str) -> bool {
        let newly = self.revoked.revoke(token);
        debug!(newly_revoked = newly, "Token revoked");
        newly
    }

    pub fn revocations(&self) -> &Arc<RevocationSet> {
        &self.revoked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"token-signing-key-at-least-32-bytes!!";
    const T: u64 = 1_700_000_000;

    fn codec() -> TokenCodec {
        TokenCodec::new(KEY, DEFAULT_TOKEN_TTL, Arc::new(RevocationSet::new()))
    }

    #[test]
    fn test_round_trip_before_expiry() {
        let codec = codec();
        let issued = codec
            .issue_at(PrincipalId(7), Some(Duration::from_secs(60)), T)
            .unwrap();

        assert_eq!(issued.expires_at, T + 60);
        assert_eq!(codec.decode_at(&issued.token, T), Ok(PrincipalId(7)));
        assert_eq!(codec.decode_at(&issued.token, T + 60), Ok(PrincipalId(7)));
    }

    #[test]
    fn test_expired_after_ttl() {
        let codec = codec();
        let issued = codec
            .issue_at(PrincipalId(7), Some(Duration::from_secs(60)), T)
            .unwrap();
        assert_eq!(
            codec.decode_at(&issued.token, T + 61),
            Err(AuthErrorKind::TokenExpired)
        );
    }

    #[test]
    fn test_default_ttl_is_thirty_minutes() {
        let codec = codec();
        let issued = codec.issue_at(PrincipalId(1), None, T).unwrap();
        assert_eq!(issued.expires_at - issued.issued_at, 1800);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = codec();
        assert_eq!(
            codec.decode_at("not.a.token", T),
            Err(AuthErrorKind::TokenMalformed)
        );
        assert_eq!(codec.decode_at("", T), Err(AuthErrorKind::TokenMalformed));
    }

    #[test]
    fn test_foreign_key_is_malformed() {
        let other = TokenCodec::new(
            b"a-completely-different-signing-key!!",
            DEFAULT_TOKEN_TTL,
            Arc::new(RevocationSet::new()),
        );
        let issued = other.issue_at(PrincipalId(1), None, T).unwrap();
        assert_eq!(
            codec().decode_at(&issued.token, T),
            Err(AuthErrorKind::TokenMalformed)
        );
    }

    #[test]
    fn test_tampered_payload_is_malformed() {
        let codec = codec();
        let issued = codec.issue_at(PrincipalId(1), None, T).unwrap();
        let forged = codec.issue_at(PrincipalId(2), Some(Duration::from_secs(5)), T).unwrap();
        let forged_payload = forged.token.split('.').nth(1).unwrap();
        let mut parts: Vec<&str> = issued.token.split('.').collect();
        parts[1] = forged_payload;
        let tampered = parts.join(".");

        assert_eq!(
            codec.decode_at(&tampered, T),
            Err(AuthErrorKind::TokenMalformed)
        );
    }

    #[test]
    fn test_non_numeric_subject_is_malformed() {
        let claims = Claims {
            sub: "alice".to_string(),
            iat: T,
            exp: T + 60,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(KEY),
        )
        .unwrap();
        assert_eq!(
            codec().decode_at(&token, T),
            Err(AuthErrorKind::TokenMalformed)
        );
    }

    #[test]
    fn test_revoked_before_expiry() {
        let codec = codec();
        let issued = codec.issue_at(PrincipalId(3), None, T).unwrap();
        assert!(codec.revoke(&issued.token));
        assert!(!codec.revoke(&issued.token));
        assert_eq!(
            codec.decode_at(&issued.token, T + 1),
            Err(AuthErrorKind::TokenRevoked)
        );
    }

    #[test]
    fn test_unrelated_revocation_has_no_effect() {
        let codec = codec();
        let kept = codec.issue_at(PrincipalId(3), None, T).unwrap();
        let dropped = codec.issue_at(PrincipalId(4), None, T).unwrap();
        codec.revoke(&dropped.token);
        assert_eq!(codec.decode_at(&kept.token, T + 1), Ok(PrincipalId(3)));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_key_rejects_open_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("token.key");
        std::fs::write(&path, KEY).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(TokenCodec::load_key(&path).is_err());

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        assert_eq!(TokenCodec::load_key(&path).unwrap(), KEY);
    }

    #[cfg(unix)]
    #[test]
    fn test_load_key_rejects_short_key() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("token.key");
        std::fs::write(&path, b"short").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        assert!(TokenCodec::load_key(&path).is_err());
    }
}
