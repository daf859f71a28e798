//! Command registry for dispatching requests to handlers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::AuthenticationGate;
use crate::error::{CommandErrorKind, GateError};
use crate::principal::MemoryPrincipalStore;
use crate::socket::ConnectionMetrics;

use super::auth::{AuthenticateCommand, LoginCommand, ResolveKeyCommand};
use super::principal::{RegisterPrincipalCommand, SetRoleCommand};
use super::system::{MetricsCommand, PingCommand};
use super::token::RevokeTokenCommand;
use super::traits::Command;
use super::types::{CommandOutput, CommandParams, ExecutionContext};

/// Shared state the built-in commands operate on.
#[derive(Clone)]
pub struct GateServices {
    pub gate: Arc<AuthenticationGate>,
    pub principals: Arc<MemoryPrincipalStore>,
    pub metrics: Arc<ConnectionMetrics>,
}

/// Registry of all available commands.
#[derive(Clone)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with every built-in command wired to `services`.
    pub fn new(services: GateServices) -> Self {
        let mut registry = Self::empty();
        let GateServices {
            gate,
            principals,
            metrics,
        } = services;

        registry.register(Arc::new(PingCommand));
        registry.register(Arc::new(MetricsCommand::new(
            metrics,
            Arc::clone(&gate),
            Arc::clone(&principals),
        )));

        registry.register(Arc::new(AuthenticateCommand::new(Arc::clone(&gate))));
        registry.register(Arc::new(ResolveKeyCommand::new(Arc::clone(&gate))));
        registry.register(Arc::new(LoginCommand::new(
            Arc::clone(gate.tokens()),
            Arc::clone(&principals),
        )));

        registry.register(Arc::new(RevokeTokenCommand::new(Arc::clone(gate.tokens()))));

        registry.register(Arc::new(RegisterPrincipalCommand::new(Arc::clone(&principals))));
        registry.register(Arc::new(SetRoleCommand::new(gate, principals)));

        info!(
            count = registry.commands.len(),
            "Command registry initialized"
        );

        registry
    }

    /// A registry with no commands.
    pub fn empty() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Register a command, replacing any with the same name.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        let name = command.name();
        debug!(command = name, "Registering command");
        self.commands.insert(name, command);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    /// Validate then execute the named command.
    pub fn dispatch(
        &self,
        ctx: &ExecutionContext,
        command_name: &str,
        params: CommandParams,
    ) -> Result<CommandOutput, GateError> {
        let command = self
            .commands
            .get(command_name)
            .ok_or_else(|| GateError::Command {
                kind: CommandErrorKind::UnknownCommand {
                    name: command_name.to_string(),
                },
            })?;

        command.validate(&params)?;
        command.execute(ctx, params)
    }

    /// All registered command names, sorted.
    pub fn list_commands(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
