//! Ping command for health checking.

use crate::error::GateError;

use super::super::traits::Command;
use super::super::types::{CommandOutput, CommandParams, ExecutionContext};

/// Returns a pong with the daemon's clock, so callers can spot skew against
/// the timestamp window before signing.
pub struct PingCommand;

impl Command for PingCommand {
    fn name(&self) -> &'static str {
        "system.ping"
    }

    fn validate(&self, _params: &CommandParams) -> Result<(), GateError> {
        Ok(())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        _params: CommandParams,
    ) -> Result<CommandOutput, GateError> {
        Ok(CommandOutput::new(serde_json::json!({
            "pong": true,
            "timestamp": ctx.received_at,
            "request_id": ctx.request_id.to_string(),
        })))
    }

    fn requires_audit(&self) -> bool {
        // High-frequency health check
        false
    }
}
