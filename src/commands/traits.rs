//! Command trait definition.

use crate::error::GateError;

use super::types::{CommandOutput, CommandParams, ExecutionContext};

/// Core trait for every operation the gate exposes on its socket.
///
/// # Example
///
/// ```ignore
/// pub struct EchoCommand;
///
/// impl Command for EchoCommand {
///     fn name(&self) -> &'static str {
///         "system.echo"
///     }
///
///     fn validate(&self, params: &CommandParams) -> Result<(), GateError> {
///         params.require_string("value")
///     }
///
///     fn execute(
///         &self,
///         _ctx: &ExecutionContext,
///         params: CommandParams,
///     ) -> Result<CommandOutput, GateError> {
///         let value = params.get_string("value")?;
///         Ok(CommandOutput::new(serde_json::json!({ "value": value })))
///     }
/// }
/// ```
pub trait Command: Send + Sync {
    /// Unique command identifier (e.g., "auth.authenticate").
    fn name(&self) -> &'static str;

    /// Check parameters before execution.
    fn validate(&self, params: &CommandParams) -> Result<(), GateError>;

    /// Execute the command.
    ///
    /// Called from a blocking context: principal lookups may block on an
    /// external store.
    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandOutput, GateError>;

    /// Whether this command is written to the audit log.
    fn requires_audit(&self) -> bool {
        true
    }
}
