//! Exchange a username and password for a bearer token.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::auth::TokenCodec;
use crate::error::{GateError, ValidationErrorKind};
use crate::principal::MemoryPrincipalStore;

use super::super::traits::Command;
use super::super::types::{CommandOutput, CommandParams, ExecutionContext};
use super::credentials;

/// Longest lifetime a caller may request.
const MAX_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Verifies login credentials, then mints a token for the principal.
pub struct LoginCommand {
    tokens: Arc<TokenCodec>,
    store: Arc<MemoryPrincipalStore>,
}

impl LoginCommand {
    pub fn new(tokens: Arc<TokenCodec>, store: Arc<MemoryPrincipalStore>) -> Self {
        Self { tokens, store }
    }
}

impl Command for LoginCommand {
    fn name(&self) -> &'static str {
        "auth.login"
    }

    fn validate(&self, params: &CommandParams) -> Result<(), GateError> {
        credentials(params)?;
        if let Some(ttl) = params.get_optional_u64("ttl_seconds")? {
            if ttl == 0 || ttl > MAX_TTL_SECONDS {
                return Err(GateError::Validation {
                    kind: ValidationErrorKind::InvalidParameter {
                        param: "ttl_seconds".to_string(),
                        message: format!("must be between 1 and {}", MAX_TTL_SECONDS),
                    },
                });
            }
        }
        Ok(())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandOutput, GateError> {
        let (username, password) = credentials(&params)?;
        let ttl = params
            .get_optional_u64("ttl_seconds")?
            .map(Duration::from_secs);

        let principal = match self.store.verify_login(&username, &password) {
            Ok(p) => p,
            Err(e) => {
                warn!(request_id = %ctx.request_id, username = %username, "Login rejected");
                return Err(e);
            }
        };

        let issued = self.tokens.issue_at(principal.id, ttl, ctx.received_at)?;

        info!(
            request_id = %ctx.request_id,
            principal_id = %principal.id,
            expires_at = issued.expires_at,
            "Token issued"
        );

        Ok(CommandOutput::new(serde_json::json!({
            "access_token": issued.token,
            "token_type": "bearer",
            "expires_at": issued.expires_at,
        }))
        .with_principal(principal.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    use crate::auth::RevocationSet;
    use crate::error::AccessErrorKind;
    use crate::principal::Principal;

    const NOW: u64 = 1_700_000_000;

    fn setup() -> (LoginCommand, Arc<TokenCodec>, Principal) {
        let tokens = Arc::new(TokenCodec::new(
            &[3u8; 32],
            Duration::from_secs(1800),
            Arc::new(RevocationSet::new()),
        ));
        let store = Arc::new(MemoryPrincipalStore::new());
        let principal = store.register("alice", "correct-horse").unwrap();
        let cmd = LoginCommand::new(Arc::clone(&tokens), store);
        (cmd, tokens, principal)
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(Uuid::new_v4(), NOW, "auth.login".to_string())
    }

    #[test]
    fn test_login_issues_token() {
        let (cmd, tokens, principal) = setup();
        let params = CommandParams::new(json!({"username": "alice", "password": "correct-horse"}));

        let output = cmd.execute(&ctx(), params).unwrap();

        assert_eq!(output.data["token_type"], "bearer");
        assert_eq!(output.data["expires_at"], NOW + 1800);
        assert_eq!(output.principal_id, Some(principal.id));
        let token = output.data["access_token"].as_str().unwrap();
        assert_eq!(tokens.decode_at(token, NOW).unwrap(), principal.id);
    }

    #[test]
    fn test_wrong_password_issues_nothing() {
        let (cmd, _, _) = setup();
        let params = CommandParams::new(json!({"username": "alice", "password": "guess"}));

        let err = cmd.execute(&ctx(), params).unwrap_err();
        assert!(matches!(
            err,
            GateError::Access {
                kind: AccessErrorKind::InvalidCredentials
            }
        ));
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_unknown_user() {
        let (cmd, _, _) = setup();
        let params = CommandParams::new(json!({"username": "bob", "password": "correct-horse"}));
        assert_eq!(
            cmd.execute(&ctx(), params).unwrap_err().code(),
            "INVALID_CREDENTIALS"
        );
    }

    #[test]
    fn test_custom_ttl() {
        let (cmd, _, _) = setup();
        let params = CommandParams::new(
            json!({"username": "alice", "password": "correct-horse", "ttl_seconds": 60}),
        );

        let output = cmd.execute(&ctx(), params).unwrap();
        assert_eq!(output.data["expires_at"], NOW + 60);
    }

    #[test]
    fn test_validate() {
        let (cmd, _, _) = setup();
        let with = CommandParams::new;
        assert!(cmd
            .validate(&with(json!({"username": "a", "password": "p", "ttl_seconds": 0})))
            .is_err());
        assert!(cmd
            .validate(&with(json!({"username": "a", "password": "p", "ttl_seconds": 90000})))
            .is_err());
        assert!(cmd
            .validate(&with(json!({"username": "a", "password": "p", "ttl_seconds": 600})))
            .is_ok());
        assert!(cmd.validate(&with(json!({"username": "a"}))).is_err());
        assert!(cmd.validate(&with(json!({"username": "", "password": "p"}))).is_err());
    }
}
