//! Response types for the gate protocol.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::GateError;

/// Replace internal error details with a generic message.
///
/// Authentication rejections and validation failures are part of the
/// caller contract and pass through; everything else is logged server-side
/// and reported generically.
fn sanitize_error_message(code: &str) -> String {
    match code {
        "PROTOCOL_ERROR" => "Malformed request".to_string(),
        "COMMAND_ERROR" => "Command execution failed".to_string(),
        "INTERNAL_ERROR" => "Internal server error".to_string(),
        _ => "An error occurred".to_string(),
    }
}

/// A response from the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Whether the request succeeded.
    pub success: bool,

    /// Unique identifier for this request/response pair.
    pub request_id: Uuid,

    /// HTTP-style status the route layer should answer with.
    pub status: u16,

    /// Response data on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error details on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

/// Error details in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code (e.g., "TOKEN_EXPIRED", "VALIDATION_ERROR").
    pub code: String,

    /// Human-readable reason.
    pub message: String,
}

impl Response {
    /// Create a success response with a specific request ID.
    pub fn success_with_id(request_id: Uuid, data: serde_json::Value) -> Self {
        Self {
            success: true,
            request_id,
            status: 200,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response from an explicit code and status.
    pub fn error_with_id(
        request_id: Uuid,
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            request_id,
            status,
            data: None,
            error: Some(ErrorResponse {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    /// Create an error response for `err`.
    ///
    /// Internal errors are sanitized before being sent to the client; the
    /// original message is logged server-side.
    pub fn from_error(request_id: Uuid, err: &GateError) -> Self {
        let code = err.code();
        let message = match err {
            GateError::Auth { kind } => kind.to_string(),
            _ if err.is_caller_visible() && !matches!(err, GateError::Protocol { .. }) => {
                err.to_string()
            }
            _ => {
                debug!(
                    request_id = %request_id,
                    code = code,
                    message = %err,
                    "Error response (sanitized for client)"
                );
                sanitize_error_message(code)
            }
        };

        Self::error_with_id(request_id, err.status_code(), code, message)
    }
}
