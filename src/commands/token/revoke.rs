//! Revoke a bearer token (logout).

use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::TokenCodec;
use crate::error::GateError;

use super::super::traits::Command;
use super::super::types::{CommandOutput, CommandParams, ExecutionContext};

/// Adds a token to the revocation set. Revoking twice is not an error.
pub struct RevokeTokenCommand {
    tokens: Arc<TokenCodec>,
}

impl RevokeTokenCommand {
    pub fn new(tokens: Arc<TokenCodec>) -> Self {
        Self { tokens }
    }
}

impl Command for RevokeTokenCommand {
    fn name(&self) -> &'static str {
        "token.revoke"
    }

    fn validate(&self, params: &CommandParams) -> Result<(), GateError> {
        params.require_string("token")
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandOutput, GateError> {
        let token = params.get_string("token")?;
        let newly_revoked = self.tokens.revoke(&token);

        if newly_revoked {
            info!(request_id = %ctx.request_id, "Token revoked");
        } else {
            debug!(request_id = %ctx.request_id, "Token already revoked");
        }

        Ok(CommandOutput::new(serde_json::json!({
            "revoked": true,
            "already_revoked": !newly_revoked,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use uuid::Uuid;

    use crate::auth::RevocationSet;
    use crate::error::AuthErrorKind;
    use crate::principal::PrincipalId;

    #[test]
    fn test_revoke_is_idempotent() {
        let tokens = Arc::new(TokenCodec::new(
            &[5u8; 32],
            Duration::from_secs(1800),
            Arc::new(RevocationSet::new()),
        ));
        let cmd = RevokeTokenCommand::new(Arc::clone(&tokens));
        let ctx = ExecutionContext::new(Uuid::new_v4(), 1_700_000_000, "token.revoke".to_string());
        let token = tokens
            .issue_at(PrincipalId(1), None, 1_700_000_000)
            .unwrap()
            .token;

        let first = cmd
            .execute(&ctx, CommandParams::new(json!({"token": token})))
            .unwrap();
        assert_eq!(first.data["already_revoked"], false);

        let second = cmd
            .execute(&ctx, CommandParams::new(json!({"token": token})))
            .unwrap();
        assert_eq!(second.data["already_revoked"], true);

        assert_eq!(
            tokens.decode_at(&token, 1_700_000_000),
            Err(AuthErrorKind::TokenRevoked)
        );
    }

    #[test]
    fn test_validate_requires_token() {
        let cmd = RevokeTokenCommand::new(Arc::new(TokenCodec::new(
            &[5u8; 32],
            Duration::from_secs(1800),
            Arc::new(RevocationSet::new()),
        )));
        assert!(cmd.validate(&CommandParams::new(json!({}))).is_err());
    }
}
