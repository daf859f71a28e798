//! Resolve a principal from its signing secret.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::AuthenticationGate;
use crate::error::{AccessErrorKind, GateError};
use crate::principal::PrincipalStore;

use super::super::traits::Command;
use super::super::types::{CommandOutput, CommandParams, ExecutionContext};

/// Key-based lookup for callers that hold only an API key.
///
/// Returns `principal_id` and `role`. The key itself is never echoed.
pub struct ResolveKeyCommand {
    gate: Arc<AuthenticationGate>,
}

impl ResolveKeyCommand {
    pub fn new(gate: Arc<AuthenticationGate>) -> Self {
        Self { gate }
    }
}

impl Command for ResolveKeyCommand {
    fn name(&self) -> &'static str {
        "auth.resolve_key"
    }

    fn validate(&self, params: &CommandParams) -> Result<(), GateError> {
        params.require_string("api_key")
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandOutput, GateError> {
        let api_key = params.get_string("api_key")?;

        let Some(principal) = self.gate.principals().lookup_by_api_key(&api_key) else {
            warn!(request_id = %ctx.request_id, "Unknown API key");
            return Err(GateError::Access {
                kind: AccessErrorKind::InvalidCredentials,
            });
        };

        debug!(request_id = %ctx.request_id, principal_id = %principal.id, "API key resolved");

        Ok(CommandOutput::new(serde_json::json!({
            "principal_id": principal.id,
            "role": principal.role,
        }))
        .with_principal(principal.id))
    }
}
