//! Register a new principal.

use std::sync::Arc;

use tracing::info;

use crate::error::GateError;
use crate::principal::MemoryPrincipalStore;

use super::super::auth::credentials;
use super::super::traits::Command;
use super::super::types::{CommandOutput, CommandParams, ExecutionContext};

/// Creates a standard principal with a login and hands back its id and
/// signing secret.
///
/// This response is the only place the secret ever leaves the daemon.
/// The password is kept only as a hash.
pub struct RegisterPrincipalCommand {
    store: Arc<MemoryPrincipalStore>,
}

impl RegisterPrincipalCommand {
    pub fn new(store: Arc<MemoryPrincipalStore>) -> Self {
        Self { store }
    }
}

impl Command for RegisterPrincipalCommand {
    fn name(&self) -> &'static str {
        "principal.register"
    }

    fn validate(&self, params: &CommandParams) -> Result<(), GateError> {
        credentials(params).map(|_| ())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandOutput, GateError> {
        let (username, password) = credentials(&params)?;
        let principal = self.store.register(&username, &password)?;

        info!(
            request_id = %ctx.request_id,
            principal_id = %principal.id,
            "Principal registered"
        );

        Ok(CommandOutput::new(serde_json::json!({
            "principal_id": principal.id,
            "username": username,
            "secret": principal.secret.as_str(),
            "role": principal.role,
        }))
        .with_principal(principal.id))
    }
}
