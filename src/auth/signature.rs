//! HMAC-SHA256 request signature verification.

use std::sync::Arc;
use std::time::Duration;

use ring::hmac;
use tracing::debug;

use crate::error::AuthErrorKind;
use crate::principal::Principal;

use super::canonical;
use super::NonceLedger;

/// Default tolerated distance between signing time and verification time.
pub const DEFAULT_TIMESTAMP_WINDOW: Duration = Duration::from_secs(60);

/// The signed parts of one inbound request.
///
/// Lives only for the duration of a verification call.
#[derive(Debug, Clone, Copy)]
pub struct SignedEnvelope<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: &'a [(String, String)],
    pub body: &'a [u8],
    pub timestamp: u64,
    pub nonce: &'a str,
    /// Hex-encoded HMAC supplied by the caller.
    pub signature: &'a str,
}

impl SignedEnvelope<'_> {
    pub fn canonical_string(&self) -> String {
        canonical::canonicalize(
            self.method,
            self.path,
            self.query,
            self.body,
            self.timestamp,
            self.nonce,
        )
    }
}

/// Compute the hex signature of a canonical string with `secret`.
pub fn sign(secret: &[u8], canonical: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hex::encode(hmac::sign(&key, canonical.as_bytes()).as_ref())
}

/// Verifies signed requests against a principal's secret.
pub struct SignatureVerifier {
    nonces: Arc<NonceLedger>,
    window: Duration,
}

impl SignatureVerifier {
    pub fn new(nonces: Arc<NonceLedger>, window: Duration) -> Self {
        Self { nonces, window }
    }

    pub fn nonces(&self) -> &Arc<NonceLedger> {
        &self.nonces
    }

    /// Verify a signed request for `principal` as of `now` (unix seconds).
    ///
    /// Checks, in order:
    /// 1. `|now - timestamp|` is within the window
    /// 2. the nonce is not live in the ledger (and records it)
    /// 3. the HMAC over the canonical string matches, compared in constant time
    ///
    /// # Errors
    ///
    /// `TimestampInvalid`, `ReplayDetected` or `SignatureMismatch`, from the
    /// first check that fails. A signature that is not hex is a mismatch.
    pub fn verify(
        &self,
        principal: &Principal,
        envelope: &SignedEnvelope<'_>,
        now: u64,
    ) -> Result<(), AuthErrorKind> {
        let skew = now.abs_diff(envelope.timestamp);
        if skew > self.window.as_secs() {
            debug!(principal_id = %principal.id, skew, "Timestamp outside window");
            return Err(AuthErrorKind::TimestampInvalid);
        }

        self.nonces.check_and_record(envelope.nonce, now)?;

        let canonical = envelope.canonical_string();
        let supplied =
            hex::decode(envelope.signature).map_err(|_| AuthErrorKind::SignatureMismatch)?;

        let key = hmac::Key::new(hmac::HMAC_SHA256, principal.secret.as_bytes());
        hmac::verify(&key, canonical.as_bytes(), &supplied).map_err(|_| {
            debug!(principal_id = %principal.id, "Signature mismatch");
            AuthErrorKind::SignatureMismatch
        })
    }
}
