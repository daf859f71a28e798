//! Authentication commands.
//!
//! Also holds the decoding of a forwarded HTTP request from command
//! parameters, shared with commands that act on behalf of a caller.

mod authenticate;
mod login;
mod resolve_key;

use base64::Engine as _;
use serde_json::Value;

use crate::auth::{InboundRequest, RequestHeaders};
use crate::error::{GateError, ValidationErrorKind};

use super::types::CommandParams;

pub use authenticate::AuthenticateCommand;
pub use login::LoginCommand;
pub use resolve_key::ResolveKeyCommand;

/// Longest accepted username.
const MAX_USERNAME_LEN: usize = 64;

fn invalid(param: &str, message: impl Into<String>) -> GateError {
    GateError::Validation {
        kind: ValidationErrorKind::InvalidParameter {
            param: param.to_string(),
            message: message.into(),
        },
    }
}

/// Read the `username` and `password` pair used by login and registration.
pub(crate) fn credentials(params: &CommandParams) -> Result<(String, String), GateError> {
    let username = params.get_string("username")?;
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(invalid(
            "username",
            format!("must be 1 to {} bytes", MAX_USERNAME_LEN),
        ));
    }
    if username.trim() != username || username.chars().any(char::is_control) {
        return Err(invalid("username", "no surrounding spaces or control characters"));
    }

    let password = params.get_string("password")?;
    if password.is_empty() {
        return Err(invalid("password", "must not be empty"));
    }
    Ok((username, password))
}

/// Decode a forwarded request.
///
/// Expected shape:
/// `{ method, path, query?, body? | body_base64?, headers: { name: value } }`.
/// `query` is the raw query string, decoded with form-urlencoded rules.
pub(crate) fn parse_inbound(params: &CommandParams) -> Result<InboundRequest, GateError> {
    let method = params.get_string("method")?;
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid("method", "expected an HTTP method"));
    }

    let path = params.get_string("path")?;
    if !path.starts_with('/') {
        return Err(invalid("path", "must start with '/'"));
    }

    let query = match params.get_optional_string("query")? {
        Some(raw) => {
            let raw = raw.strip_prefix('?').unwrap_or(&raw);
            serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
                .map_err(|e| invalid("query", e.to_string()))?
        }
        None => Vec::new(),
    };

    let body = match (
        params.get_optional_string("body")?,
        params.get_optional_string("body_base64")?,
    ) {
        (Some(_), Some(_)) => {
            return Err(invalid("body", "give either body or body_base64, not both"));
        }
        (Some(text), None) => text.into_bytes(),
        (None, Some(encoded)) => base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| invalid("body_base64", e.to_string()))?,
        (None, None) => Vec::new(),
    };

    let mut pairs = Vec::new();
    if let Some(map) = params.get_optional_object("headers")? {
        for (name, value) in map {
            match value {
                Value::String(s) => pairs.push((name.as_str(), s.clone())),
                _ => return Err(invalid("headers", format!("header '{}' must be a string", name))),
            }
        }
    }

    Ok(InboundRequest {
        method,
        path,
        query,
        body,
        headers: RequestHeaders::from_pairs(pairs),
    })
}
