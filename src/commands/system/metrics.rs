//! Metrics command for monitoring gate health.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::AuthenticationGate;
use crate::error::GateError;
use crate::principal::MemoryPrincipalStore;
use crate::socket::ConnectionMetrics;

use super::super::traits::Command;
use super::super::types::{CommandOutput, CommandParams, ExecutionContext};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns:
/// - uptime_seconds
/// - requests_total / requests_failed / active_connections
/// - nonces_live: nonces currently held for replay protection
/// - tokens_revoked
/// - principals
/// - version
pub struct MetricsCommand {
    start_time: Instant,
    metrics: Arc<ConnectionMetrics>,
    gate: Arc<AuthenticationGate>,
    store: Arc<MemoryPrincipalStore>,
}

impl MetricsCommand {
    pub fn new(
        metrics: Arc<ConnectionMetrics>,
        gate: Arc<AuthenticationGate>,
        store: Arc<MemoryPrincipalStore>,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            metrics,
            gate,
            store,
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Command for MetricsCommand {
    fn name(&self) -> &'static str {
        "system.metrics"
    }

    fn validate(&self, _params: &CommandParams) -> Result<(), GateError> {
        Ok(())
    }

    fn execute(
        &self,
        _ctx: &ExecutionContext,
        _params: CommandParams,
    ) -> Result<CommandOutput, GateError> {
        Ok(CommandOutput::new(serde_json::json!({
            "uptime_seconds": self.uptime().as_secs(),
            "requests_total": self.metrics.total_requests(),
            "requests_failed": self.metrics.failed_requests(),
            "active_connections": self.metrics.active(),
            "nonces_live": self.gate.verifier().nonces().len(),
            "tokens_revoked": self.gate.tokens().revocations().len(),
            "principals": self.store.len(),
            "version": VERSION,
        })))
    }

    fn requires_audit(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::auth::{NonceLedger, RevocationSet, SignatureVerifier, TokenCodec};

    fn setup() -> (MetricsCommand, Arc<ConnectionMetrics>, Arc<AuthenticationGate>) {
        let metrics = Arc::new(ConnectionMetrics::new());
        let store = Arc::new(MemoryPrincipalStore::new());
        store.register("alice", "pw").unwrap();
        let tokens = Arc::new(TokenCodec::new(
            &[1u8; 32],
            Duration::from_secs(1800),
            Arc::new(RevocationSet::new()),
        ));
        let verifier = SignatureVerifier::new(
            Arc::new(NonceLedger::new(Duration::from_secs(300))),
            Duration::from_secs(60),
        );
        let gate = Arc::new(AuthenticationGate::new(tokens, verifier, store.clone()));
        let cmd = MetricsCommand::new(Arc::clone(&metrics), Arc::clone(&gate), store);
        (cmd, metrics, gate)
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(Uuid::new_v4(), 0, "system.metrics".to_string())
    }

    #[test]
    fn test_metrics_execute() {
        let (cmd, _, _) = setup();
        let output = cmd
            .execute(&ctx(), CommandParams::new(serde_json::json!({})))
            .unwrap();

        assert!(output.data["uptime_seconds"].is_u64());
        assert_eq!(output.data["requests_total"], 0);
        assert_eq!(output.data["nonces_live"], 0);
        assert_eq!(output.data["tokens_revoked"], 0);
        assert_eq!(output.data["principals"], 1);
        assert!(output.data["version"].is_string());
        assert!(!cmd.requires_audit());
    }

    #[test]
    fn test_metrics_tracks_state() {
        let (cmd, metrics, gate) = setup();
        metrics.record_request(true);
        metrics.record_request(false);
        gate.verifier().nonces().check_and_record("n1", 100).unwrap();
        gate.tokens().revoke("some.token.value");

        let output = cmd
            .execute(&ctx(), CommandParams::new(serde_json::json!({})))
            .unwrap();
        assert_eq!(output.data["requests_total"], 2);
        assert_eq!(output.data["requests_failed"], 1);
        assert_eq!(output.data["nonces_live"], 1);
        assert_eq!(output.data["tokens_revoked"], 1);
    }
}
