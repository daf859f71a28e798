//! Request types for the gate protocol.

use serde::{Deserialize, Serialize};

/// A request from the route layer.
///
/// The socket is trusted by file permissions; authentication of the end
/// client happens inside `auth.authenticate` on the forwarded request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateRequest {
    /// The command to execute (e.g., "auth.authenticate", "auth.login").
    pub command: String,

    /// Command parameters as a JSON object.
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
}

fn empty_params() -> serde_json::Value {
    serde_json::json!({})
}

impl GateRequest {
    pub fn new(command: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            command: command.into(),
            params,
        }
    }
}
