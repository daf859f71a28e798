//! Audit entry types.

use serde::Serialize;
use uuid::Uuid;

use crate::principal::PrincipalId;

/// A single audit log entry.
///
/// Records the command, its sanitized parameters, the principal the request
/// resolved to (if any), the outcome and timing.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub request_id: Uuid,
    pub command: String,
    /// Sanitized parameters (sensitive values redacted).
    pub params: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<PrincipalId>,
    pub result: AuditResult,
    pub duration_ms: u64,
}

impl AuditEntry {
    pub fn success(
        timestamp: String,
        request_id: Uuid,
        command: String,
        params: serde_json::Value,
        principal_id: Option<PrincipalId>,
        data: Option<serde_json::Value>,
        duration_ms: u64,
    ) -> Self {
        Self {
            timestamp,
            request_id,
            command,
            params,
            principal_id,
            result: AuditResult::Success { data },
            duration_ms,
        }
    }

    /// `principal_id` is the actor when the failure names one, e.g. a
    /// forbidden role change.
    pub fn failure(
        timestamp: String,
        request_id: Uuid,
        command: String,
        params: serde_json::Value,
        principal_id: Option<PrincipalId>,
        error_code: String,
        error_message: String,
        duration_ms: u64,
    ) -> Self {
        Self {
            timestamp,
            request_id,
            command,
            params,
            principal_id,
            result: AuditResult::Failure {
                error_code,
                error_message,
            },
            duration_ms,
        }
    }
}

/// Outcome recorded in the audit trail.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum AuditResult {
    #[serde(rename = "success")]
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    #[serde(rename = "failure")]
    Failure {
        error_code: String,
        error_message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_serialization() {
        let entry = AuditEntry::success(
            "2026-01-15T10:30:45.123Z".to_string(),
            Uuid::nil(),
            "auth.authenticate".to_string(),
            serde_json::json!({"path": "/events"}),
            Some(PrincipalId(42)),
            Some(serde_json::json!({"mode": "signed"})),
            3,
        );

        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["result"]["status"], "success");
        assert_eq!(json["principal_id"], 42);
        assert_eq!(json["duration_ms"], 3);
    }

    #[test]
    fn test_failure_serialization() {
        let entry = AuditEntry::failure(
            "2026-01-15T10:30:45.123Z".to_string(),
            Uuid::nil(),
            "auth.authenticate".to_string(),
            serde_json::json!({}),
            None,
            "REPLAY_DETECTED".to_string(),
            "Nonce already used (replay detected)".to_string(),
            1,
        );

        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["result"]["status"], "failure");
        assert_eq!(json["result"]["error_code"], "REPLAY_DETECTED");
        assert!(json.get("principal_id").is_none());
    }

    #[test]
    fn test_failure_records_known_actor() {
        let entry = AuditEntry::failure(
            "2026-01-15T10:30:45.123Z".to_string(),
            Uuid::nil(),
            "principal.set_role".to_string(),
            serde_json::json!({"principal_id": 1, "role": "administrator"}),
            Some(PrincipalId(2)),
            "FORBIDDEN".to_string(),
            "Principal 2 is not allowed to change roles".to_string(),
            1,
        );

        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["principal_id"], 2);
        assert_eq!(json["result"]["error_code"], "FORBIDDEN");
    }
}
