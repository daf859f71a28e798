//! Change a principal's role on behalf of an authenticated administrator.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::AuthenticationGate;
use crate::error::GateError;
use crate::principal::{MemoryPrincipalStore, Role};

use super::super::auth::parse_inbound;
use super::super::traits::Command;
use super::super::types::{CommandOutput, CommandParams, ExecutionContext};

/// The forwarded `request` is authenticated through the gate first; the
/// principal it resolves to is the actor whose role is checked.
pub struct SetRoleCommand {
    gate: Arc<AuthenticationGate>,
    store: Arc<MemoryPrincipalStore>,
}

impl SetRoleCommand {
    pub fn new(gate: Arc<AuthenticationGate>, store: Arc<MemoryPrincipalStore>) -> Self {
        Self { gate, store }
    }

    fn request_params(params: &CommandParams) -> Result<CommandParams, GateError> {
        let request = params.get_object("request")?;
        Ok(CommandParams::new(serde_json::Value::Object(request.clone())))
    }
}

impl Command for SetRoleCommand {
    fn name(&self) -> &'static str {
        "principal.set_role"
    }

    fn validate(&self, params: &CommandParams) -> Result<(), GateError> {
        parse_inbound(&Self::request_params(params)?)?;
        params.get_principal_id("principal_id")?;
        params.get_string("role")?.parse::<Role>()?;
        Ok(())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandOutput, GateError> {
        let request = parse_inbound(&Self::request_params(&params)?)?;
        let target = params.get_principal_id("principal_id")?;
        let role: Role = params.get_string("role")?.parse()?;

        let actor = match self.gate.authenticate_at(&request, ctx.received_at) {
            Ok(authenticated) => authenticated.principal,
            Err(kind) => {
                warn!(
                    request_id = %ctx.request_id,
                    reason = kind.code(),
                    "Role change rejected at authentication"
                );
                return Err(kind.into());
            }
        };

        let updated = self.store.set_role(&actor, target, role)?;

        info!(
            request_id = %ctx.request_id,
            actor = %actor.id,
            principal_id = %updated.id,
            role = updated.role.as_str(),
            "Role updated"
        );

        Ok(CommandOutput::new(serde_json::json!({
            "principal_id": updated.id,
            "role": updated.role,
        }))
        .with_principal(actor.id))
    }
}
