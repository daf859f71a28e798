//! Single entry point for authenticating a protected request.

use std::sync::Arc;

use tracing::debug;

use crate::error::AuthErrorKind;
use crate::principal::{Principal, PrincipalStore};

use super::signature::{SignatureVerifier, SignedEnvelope};
use super::{unix_now, TokenCodec};

pub const AUTHORIZATION_HEADER: &str = "authorization";
pub const SIGNATURE_HEADER: &str = "x-signature";
pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const NONCE_HEADER: &str = "x-nonce";

/// Authentication-relevant headers of an inbound request.
///
/// Empty values are treated as absent. A header given twice with a value is
/// flagged rather than resolved, so the gate can reject the request.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    pub authorization: Option<String>,
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    pub nonce: Option<String>,
    /// `Authorization` appeared more than once.
    pub duplicate_authorization: bool,
    /// A signing header appeared more than once.
    pub duplicate_signing: bool,
}

impl RequestHeaders {
    /// Pick the relevant headers out of `(name, value)` pairs, ignoring case.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut headers = Self::default();
        for (name, value) in pairs {
            let (slot, duplicate) = match name.as_ref().to_ascii_lowercase().as_str() {
                AUTHORIZATION_HEADER => {
                    (&mut headers.authorization, &mut headers.duplicate_authorization)
                }
                SIGNATURE_HEADER => (&mut headers.signature, &mut headers.duplicate_signing),
                TIMESTAMP_HEADER => (&mut headers.timestamp, &mut headers.duplicate_signing),
                NONCE_HEADER => (&mut headers.nonce, &mut headers.duplicate_signing),
                _ => continue,
            };
            let value: String = value.into();
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            if slot.is_some() {
                *duplicate = true;
            }
            *slot = Some(trimmed.to_string());
        }
        headers
    }
}

/// Everything the gate needs to know about one request.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub headers: RequestHeaders,
}

/// The complete set of signing headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningHeaders {
    pub signature: String,
    pub timestamp: u64,
    pub nonce: String,
}

/// How a request asks to be authenticated, resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningMode {
    /// No signing headers: bearer token alone.
    TokenOnly,
    /// All three signing headers present.
    Signed(SigningHeaders),
}

impl SigningMode {
    /// Resolve the mode from the optional signing headers.
    ///
    /// None present is token-only; all present is signed; any other
    /// combination, or a non-decimal timestamp, is malformed.
    pub fn resolve(
        signature: Option<&str>,
        timestamp: Option<&str>,
        nonce: Option<&str>,
    ) -> Result<Self, AuthErrorKind> {
        match (signature, timestamp, nonce) {
            (None, None, None) => Ok(SigningMode::TokenOnly),
            (Some(signature), Some(timestamp), Some(nonce)) => {
                let timestamp = timestamp
                    .parse::<u64>()
                    .map_err(|_| AuthErrorKind::MalformedSigningHeaders)?;
                Ok(SigningMode::Signed(SigningHeaders {
                    signature: signature.to_string(),
                    timestamp,
                    nonce: nonce.to_string(),
                }))
            }
            _ => Err(AuthErrorKind::MalformedSigningHeaders),
        }
    }

    pub fn from_headers(headers: &RequestHeaders) -> Result<Self, AuthErrorKind> {
        if headers.duplicate_signing {
            return Err(AuthErrorKind::MalformedSigningHeaders);
        }
        Self::resolve(
            headers.signature.as_deref(),
            headers.timestamp.as_deref(),
            headers.nonce.as_deref(),
        )
    }
}

/// Assurance level of a successful authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    TokenOnly,
    Signed,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::TokenOnly => "token_only",
            AuthMode::Signed => "signed",
        }
    }
}

/// Outcome of a successful authentication.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub principal: Principal,
    pub mode: AuthMode,
}

/// Extract the token from an `Authorization: Bearer <token>` value.
///
/// A bare `Bearer` scheme with no credentials is `MissingToken`; any other
/// scheme, or a value without one, is `TokenMalformed`.
pub fn extract_bearer(authorization: Option<&str>) -> Result<&str, AuthErrorKind> {
    let value = authorization.ok_or(AuthErrorKind::MissingToken)?.trim();
    if value.eq_ignore_ascii_case("bearer") {
        return Err(AuthErrorKind::MissingToken);
    }
    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthErrorKind::TokenMalformed)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthErrorKind::TokenMalformed);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthErrorKind::MissingToken);
    }
    Ok(token)
}

/// Bearer token validation plus optional request signature verification.
pub struct AuthenticationGate {
    tokens: Arc<TokenCodec>,
    verifier: SignatureVerifier,
    principals: Arc<dyn PrincipalStore>,
}

impl AuthenticationGate {
    pub fn new(
        tokens: Arc<TokenCodec>,
        verifier: SignatureVerifier,
        principals: Arc<dyn PrincipalStore>,
    ) -> Self {
        Self {
            tokens,
            verifier,
            principals,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenCodec> {
        &self.tokens
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    pub fn principals(&self) -> &Arc<dyn PrincipalStore> {
        &self.principals
    }

    /// Authenticate a request against the current time.
    pub fn authenticate(&self, request: &InboundRequest) -> Result<Authenticated, AuthErrorKind> {
        self.authenticate_at(request, unix_now())
    }

    /// Authenticate a request as of `now` (unix seconds).
    ///
    /// # Arguments
    ///
    /// * `request` - The forwarded request with its auth headers
    /// * `now` - Verification time, used for token expiry and the signing window
    ///
    /// # Errors
    ///
    /// Returns the first rejection met: bearer extraction, token decoding,
    /// principal lookup, signing-mode resolution, then signature verification.
    pub fn authenticate_at(
        &self,
        request: &InboundRequest,
        now: u64,
    ) -> Result<Authenticated, AuthErrorKind> {
        if request.headers.duplicate_authorization {
            return Err(AuthErrorKind::TokenMalformed);
        }
        let token = extract_bearer(request.headers.authorization.as_deref())?;
        let subject = self.tokens.decode_at(token, now)?;

        let principal = self
            .principals
            .lookup_by_id(subject)
            .ok_or(AuthErrorKind::UnknownPrincipal)?;

        match SigningMode::from_headers(&request.headers)? {
            SigningMode::TokenOnly => {
                debug!(principal_id = %principal.id, "Authenticated by token only");
                Ok(Authenticated {
                    principal,
                    mode: AuthMode::TokenOnly,
                })
            }
            SigningMode::Signed(signing) => {
                let envelope = SignedEnvelope {
                    method: &request.method,
                    path: &request.path,
                    query: &request.query,
                    body: &request.body,
                    timestamp: signing.timestamp,
                    nonce: &signing.nonce,
                    signature: &signing.signature,
                };
                self.verifier.verify(&principal, &envelope, now)?;
                debug!(principal_id = %principal.id, "Authenticated by signed request");
                Ok(Authenticated {
                    principal,
                    mode: AuthMode::Signed,
                })
            }
        }
    }
}
