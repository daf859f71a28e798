//! Command types: parameters, output, and execution context.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{GateError, ValidationErrorKind};
use crate::principal::PrincipalId;

fn missing(key: &str) -> GateError {
    GateError::Validation {
        kind: ValidationErrorKind::MissingParameter {
            param: key.to_string(),
        },
    }
}

fn invalid(key: &str, message: impl Into<String>) -> GateError {
    GateError::Validation {
        kind: ValidationErrorKind::InvalidParameter {
            param: key.to_string(),
            message: message.into(),
        },
    }
}

/// Wrapper around command parameters with typed accessors.
#[derive(Debug, Clone)]
pub struct CommandParams {
    inner: Value,
}

impl CommandParams {
    pub fn new(value: Value) -> Self {
        Self { inner: value }
    }

    pub fn as_value(&self) -> &Value {
        &self.inner
    }

    /// Get a required string parameter.
    pub fn get_string(&self, key: &str) -> Result<String, GateError> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Err(missing(key)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(invalid(key, "expected a string")),
        }
    }

    /// Get an optional string parameter. Present but non-string is an error.
    pub fn get_optional_string(&self, key: &str) -> Result<Option<String>, GateError> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(invalid(key, "expected a string")),
        }
    }

    /// Get a required unsigned integer parameter.
    pub fn get_u64(&self, key: &str) -> Result<u64, GateError> {
        self.get_optional_u64(key)?.ok_or_else(|| missing(key))
    }

    /// Get an optional unsigned integer parameter.
    pub fn get_optional_u64(&self, key: &str) -> Result<Option<u64>, GateError> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| invalid(key, "expected a non-negative integer")),
        }
    }

    /// Get a required principal id parameter.
    pub fn get_principal_id(&self, key: &str) -> Result<PrincipalId, GateError> {
        self.get_u64(key).map(PrincipalId)
    }

    /// Get an optional object parameter.
    pub fn get_optional_object(&self, key: &str) -> Result<Option<&Map<String, Value>>, GateError> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(invalid(key, "expected an object")),
        }
    }

    /// Get a required object parameter.
    pub fn get_object(&self, key: &str) -> Result<&Map<String, Value>, GateError> {
        self.get_optional_object(key)?.ok_or_else(|| missing(key))
    }

    /// Require that a string parameter exists (for validation).
    pub fn require_string(&self, key: &str) -> Result<(), GateError> {
        self.get_string(key).map(|_| ())
    }
}

impl From<Value> for CommandParams {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Successful command output.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Response data.
    pub data: Value,
    /// Principal the request acted as, for the audit trail.
    pub principal_id: Option<PrincipalId>,
}

impl CommandOutput {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            principal_id: None,
        }
    }

    pub fn with_principal(mut self, id: PrincipalId) -> Self {
        self.principal_id = Some(id);
        self
    }
}

/// Execution context for a command.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Unique identifier for this request.
    pub request_id: Uuid,
    /// Unix time the request was received; the clock for every check it runs.
    pub received_at: u64,
    /// The command being executed.
    pub command: String,
}

impl ExecutionContext {
    pub fn new(request_id: Uuid, received_at: u64, command: String) -> Self {
        Self {
            request_id,
            received_at,
            command,
        }
    }
}
