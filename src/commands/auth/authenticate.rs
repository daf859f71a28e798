//! Authenticate a forwarded request.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::AuthenticationGate;
use crate::error::GateError;

use super::super::traits::Command;
use super::super::types::{CommandOutput, CommandParams, ExecutionContext};
use super::parse_inbound;

/// Runs the authentication gate over a request forwarded by the route layer.
///
/// Returns `principal_id`, `role` and `mode` on success. A rejection is
/// returned as an `Auth` error carrying the reason.
pub struct AuthenticateCommand {
    gate: Arc<AuthenticationGate>,
}

impl AuthenticateCommand {
    pub fn new(gate: Arc<AuthenticationGate>) -> Self {
        Self { gate }
    }
}

impl Command for AuthenticateCommand {
    fn name(&self) -> &'static str {
        "auth.authenticate"
    }

    fn validate(&self, params: &CommandParams) -> Result<(), GateError> {
        parse_inbound(params).map(|_| ())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandOutput, GateError> {
        let request = parse_inbound(&params)?;

        match self.gate.authenticate_at(&request, ctx.received_at) {
            Ok(authenticated) => {
                let principal = authenticated.principal;
                info!(
                    request_id = %ctx.request_id,
                    principal_id = %principal.id,
                    mode = authenticated.mode.as_str(),
                    "Request authenticated"
                );
                Ok(CommandOutput::new(serde_json::json!({
                    "principal_id": principal.id,
                    "role": principal.role,
                    "mode": authenticated.mode.as_str(),
                }))
                .with_principal(principal.id))
            }
            Err(kind) => {
                warn!(
                    request_id = %ctx.request_id,
                    method = %request.method,
                    path = %request.path,
                    reason = kind.code(),
                    "Request rejected"
                );
                Err(kind.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use uuid::Uuid;

    use crate::auth::{
        canonical, sign, NonceLedger, RevocationSet, SignatureVerifier, TokenCodec,
    };
    use crate::error::AuthErrorKind;
    use crate::principal::{MemoryPrincipalStore, Principal, PrincipalSecret, PrincipalId, Role};

    const NOW: u64 = 1_700_000_000;
    const SECRET: &str = "3f6c0a9e1b2d4c5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6";

    fn setup() -> (AuthenticateCommand, Arc<TokenCodec>) {
        let tokens = Arc::new(TokenCodec::new(
            &[7u8; 32],
            Duration::from_secs(1800),
            Arc::new(RevocationSet::new()),
        ));
        let store = Arc::new(MemoryPrincipalStore::new());
        store
            .insert(Principal {
                id: PrincipalId(42),
                secret: PrincipalSecret::from_string(SECRET),
                role: Role::Standard,
            })
            .unwrap();
        let verifier = SignatureVerifier::new(
            Arc::new(NonceLedger::new(Duration::from_secs(300))),
            Duration::from_secs(60),
        );
        let gate = Arc::new(AuthenticationGate::new(Arc::clone(&tokens), verifier, store));
        (AuthenticateCommand::new(gate), tokens)
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(Uuid::new_v4(), NOW, "auth.authenticate".to_string())
    }

    #[test]
    fn test_token_only() {
        let (cmd, tokens) = setup();
        let token = tokens.issue_at(PrincipalId(42), None, NOW).unwrap().token;
        let params = CommandParams::new(json!({
            "method": "GET",
            "path": "/events",
            "headers": {"Authorization": format!("Bearer {}", token)}
        }));

        let output = cmd.execute(&ctx(), params).unwrap();
        assert_eq!(output.data["principal_id"], 42);
        assert_eq!(output.data["role"], "standard");
        assert_eq!(output.data["mode"], "token_only");
        assert_eq!(output.principal_id, Some(PrincipalId(42)));
    }

    #[test]
    fn test_signed_request() {
        let (cmd, tokens) = setup();
        let token = tokens.issue_at(PrincipalId(42), None, NOW).unwrap().token;
        let query = vec![("seats".to_string(), "2".to_string())];
        let canonical = canonical::canonicalize("POST", "/bookings", &query, b"{}", NOW, "abc");
        let signature = sign(SECRET.as_bytes(), &canonical);

        let params = CommandParams::new(json!({
            "method": "POST",
            "path": "/bookings",
            "query": "seats=2",
            "body": "{}",
            "headers": {
                "authorization": format!("Bearer {}", token),
                "x-signature": signature,
                "x-timestamp": NOW.to_string(),
                "x-nonce": "abc"
            }
        }));

        let output = cmd.execute(&ctx(), params).unwrap();
        assert_eq!(output.data["mode"], "signed");
    }

    #[test]
    fn test_rejection_carries_reason() {
        let (cmd, _) = setup();
        let params = CommandParams::new(json!({"method": "GET", "path": "/events"}));

        let err = cmd.execute(&ctx(), params).unwrap_err();
        assert!(matches!(
            err,
            GateError::Auth {
                kind: AuthErrorKind::MissingToken
            }
        ));
    }

    #[test]
    fn test_validate_requires_method_and_path() {
        let (cmd, _) = setup();
        assert!(cmd.validate(&CommandParams::new(json!({"path": "/"}))).is_err());
        assert!(cmd.validate(&CommandParams::new(json!({"method": "GET"}))).is_err());
    }
}
