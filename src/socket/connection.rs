//! Per-connection handler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::{sanitize_params, AuditEntry, AuditLogger};
use crate::auth::unix_now;
use crate::commands::{CommandOutput, CommandParams, CommandRegistry, ExecutionContext};
use crate::config::Settings;
use crate::error::{GateError, ProtocolErrorKind};
use crate::principal::PrincipalId;
use crate::protocol::{read_json, write_json, GateRequest, Response};

use super::ConnectionMetrics;

/// Serve requests on one connection until the client disconnects or idles
/// past the socket timeout.
pub async fn handle_connection(
    stream: UnixStream,
    settings: Arc<Settings>,
    command_registry: Arc<CommandRegistry>,
    audit_logger: Option<Arc<AuditLogger>>,
    metrics: Arc<ConnectionMetrics>,
) -> Result<(), GateError> {
    let (mut reader, mut writer) = stream.into_split();

    loop {
        let result = process_request(
            &mut reader,
            &mut writer,
            &settings,
            &command_registry,
            audit_logger.as_ref(),
            &metrics,
        )
        .await;

        match result {
            Ok(()) => continue,
            Err(GateError::Protocol {
                kind: ProtocolErrorKind::ConnectionClosed,
            }) => {
                debug!("Client disconnected");
                return Ok(());
            }
            Err(GateError::Protocol {
                kind: ProtocolErrorKind::ConnectionTimeout,
            }) => {
                debug!("Connection idle timeout");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Read one request, dispatch it, write the response.
async fn process_request<R, W>(
    reader: &mut R,
    writer: &mut W,
    settings: &Settings,
    command_registry: &Arc<CommandRegistry>,
    audit_logger: Option<&Arc<AuditLogger>>,
    metrics: &ConnectionMetrics,
) -> Result<(), GateError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let socket_timeout = Duration::from_secs(settings.limits.socket_timeout_seconds);

    let request: GateRequest =
        match read_json(reader, settings.limits.max_message_size, socket_timeout).await {
            Ok(request) => request,
            Err(e @ GateError::Protocol {
                kind: ProtocolErrorKind::InvalidMessageFormat { .. },
            })
            | Err(e @ GateError::Protocol {
                kind: ProtocolErrorKind::MessageTooLarge { .. },
            }) => {
                // Answer, then drop the connection: framing can't be trusted
                let request_id = Uuid::new_v4();
                warn!(request_id = %request_id, error = %e, "Rejected malformed message");
                metrics.record_request(false);
                write_json(writer, &Response::from_error(request_id, &e), socket_timeout).await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

    let request_id = Uuid::new_v4();
    let received_at = unix_now();
    let start_time = Instant::now();

    info!(
        request_id = %request_id,
        command = %request.command,
        "Received request"
    );

    // Unknown commands are still audited
    let requires_audit = command_registry
        .get(&request.command)
        .map(|cmd| cmd.requires_audit())
        .unwrap_or(true);

    let sanitized_params = match audit_logger {
        Some(_) if requires_audit => Some(sanitize_params(&request.params)),
        _ => None,
    };

    let ctx = ExecutionContext::new(request_id, received_at, request.command.clone());
    let params = CommandParams::new(request.params);
    let registry = Arc::clone(command_registry);
    let command_name = request.command.clone();

    // Principal lookups may block on an external store
    let result = tokio::task::spawn_blocking(move || registry.dispatch(&ctx, &command_name, params))
        .await
        .unwrap_or_else(|e| {
            error!(request_id = %request_id, error = %e, "Command task panicked");
            Err(GateError::Command {
                kind: crate::error::CommandErrorKind::ExecutionFailed {
                    message: "command task panicked".to_string(),
                },
            })
        });

    let response = match &result {
        Ok(output) => {
            debug!(request_id = %request_id, command = %request.command, "Command succeeded");
            Response::success_with_id(request_id, output.data.clone())
        }
        Err(e) => {
            if e.is_caller_visible() {
                info!(
                    request_id = %request_id,
                    command = %request.command,
                    code = e.code(),
                    status = e.status_code(),
                    "Request refused"
                );
            } else {
                error!(
                    request_id = %request_id,
                    command = %request.command,
                    error = %e,
                    "Command execution failed"
                );
            }
            Response::from_error(request_id, e)
        }
    };

    metrics.record_request(result.is_ok());

    if let (Some(logger), Some(params)) = (audit_logger, sanitized_params) {
        let entry = audit_entry(
            request_id,
            request.command,
            params,
            &result,
            start_time.elapsed().as_millis() as u64,
        );
        if let Err(e) = logger.log(&entry) {
            error!(error = %e, "Failed to write audit log entry");
        }
    }

    write_json(writer, &response, socket_timeout).await
}

fn audit_entry(
    request_id: Uuid,
    command: String,
    params: serde_json::Value,
    result: &Result<CommandOutput, GateError>,
    duration_ms: u64,
) -> AuditEntry {
    let timestamp = Utc::now().to_rfc3339();
    match result {
        Ok(output) => AuditEntry::success(
            timestamp,
            request_id,
            command,
            params,
            output.principal_id,
            Some(sanitize_params(&output.data)),
            duration_ms,
        ),
        Err(e) => AuditEntry::failure(
            timestamp,
            request_id,
            command,
            params,
            e.principal_id().map(PrincipalId),
            e.code().to_string(),
            e.to_string(),
            duration_ms,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AccessErrorKind, AuthErrorKind};

    #[test]
    fn test_audit_entry_redacts_result_data() {
        let output = CommandOutput::new(serde_json::json!({
            "principal_id": 3,
            "secret": "00ff",
        }))
        .with_principal(PrincipalId(3));

        let entry = audit_entry(
            Uuid::nil(),
            "principal.register".to_string(),
            serde_json::json!({}),
            &Ok(output),
            1,
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["principal_id"], 3);
        assert_eq!(json["result"]["data"]["secret"], "[REDACTED]");
    }

    #[test]
    fn test_audit_entry_records_rejection_code() {
        let entry = audit_entry(
            Uuid::nil(),
            "auth.authenticate".to_string(),
            serde_json::json!({}),
            &Err(AuthErrorKind::TokenExpired.into()),
            1,
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["result"]["error_code"], "TOKEN_EXPIRED");
    }

    #[test]
    fn test_audit_entry_names_forbidden_actor() {
        let forbidden = GateError::Access {
            kind: AccessErrorKind::Forbidden {
                principal_id: 2,
                action: "change roles".to_string(),
            },
        };
        let entry = audit_entry(
            Uuid::nil(),
            "principal.set_role".to_string(),
            serde_json::json!({"principal_id": 1, "role": "administrator"}),
            &Err(forbidden),
            1,
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["principal_id"], 2);
        assert_eq!(json["result"]["error_code"], "FORBIDDEN");
    }
}
