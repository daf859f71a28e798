//! Error types for the signgate daemon.

use thiserror::Error;

/// Main error type for the gate.
#[derive(Error, Debug)]
pub enum GateError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Socket-related errors.
    #[error("Socket error: {message}")]
    Socket { message: String },

    /// Authentication rejections.
    #[error("Authentication rejected: {kind}")]
    Auth { kind: AuthErrorKind },

    /// Authorization failures for principal administration.
    #[error("Access error: {kind}")]
    Access { kind: AccessErrorKind },

    /// Parameter validation errors.
    #[error("Validation error: {kind}")]
    Validation { kind: ValidationErrorKind },

    /// Command dispatch errors.
    #[error("Command error: {kind}")]
    Command { kind: CommandErrorKind },

    /// Protocol errors.
    #[error("Protocol error: {kind}")]
    Protocol { kind: ProtocolErrorKind },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Authentication rejection reasons.
///
/// Every variant is terminal for the request that produced it. The code and
/// status are part of the caller-visible contract and must stay stable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    #[error("Bearer token missing")]
    MissingToken,

    #[error("Bearer token malformed or signature invalid")]
    TokenMalformed,

    #[error("Bearer token expired")]
    TokenExpired,

    #[error("Bearer token revoked")]
    TokenRevoked,

    #[error("Signing headers incomplete or malformed")]
    MalformedSigningHeaders,

    #[error("Timestamp outside the accepted window")]
    TimestampInvalid,

    #[error("Nonce already used (replay detected)")]
    ReplayDetected,

    #[error("Request signature mismatch")]
    SignatureMismatch,

    #[error("Token subject does not resolve to a principal")]
    UnknownPrincipal,
}

impl AuthErrorKind {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::TokenMalformed => "TOKEN_MALFORMED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenRevoked => "TOKEN_REVOKED",
            Self::MalformedSigningHeaders => "MALFORMED_SIGNING_HEADERS",
            Self::TimestampInvalid => "TIMESTAMP_INVALID",
            Self::ReplayDetected => "REPLAY_DETECTED",
            Self::SignatureMismatch => "SIGNATURE_MISMATCH",
            Self::UnknownPrincipal => "UNKNOWN_PRINCIPAL",
        }
    }

    /// HTTP-style status code for the rejection.
    ///
    /// 401 for identity and signature failures, 403 for replay and timestamp
    /// policy failures, 400 for structurally malformed input.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedSigningHeaders => 400,
            Self::TimestampInvalid | Self::ReplayDetected => 403,
            Self::MissingToken
            | Self::TokenMalformed
            | Self::TokenExpired
            | Self::TokenRevoked
            | Self::SignatureMismatch
            | Self::UnknownPrincipal => 401,
        }
    }
}

impl From<AuthErrorKind> for GateError {
    fn from(kind: AuthErrorKind) -> Self {
        GateError::Auth { kind }
    }
}

/// Principal administration failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessErrorKind {
    #[error("Principal {principal_id} is not allowed to {action}")]
    Forbidden { principal_id: u64, action: String },

    #[error("Principal not found: {principal_id}")]
    PrincipalNotFound { principal_id: u64 },

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Username already taken: {username}")]
    UsernameTaken { username: String },
}

/// Validation error kinds.
#[derive(Error, Debug)]
pub enum ValidationErrorKind {
    #[error("Missing required parameter: {param}")]
    MissingParameter { param: String },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },
}

/// Command error kinds.
#[derive(Error, Debug)]
pub enum CommandErrorKind {
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    #[error("Command execution failed: {message}")]
    ExecutionFailed { message: String },
}

/// Protocol error kinds.
#[derive(Error, Debug)]
pub enum ProtocolErrorKind {
    #[error("Message too large: {size} bytes exceeds maximum of {max} bytes")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Invalid message format: {message}")]
    InvalidMessageFormat { message: String },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection timed out")]
    ConnectionTimeout,
}

impl GateError {
    /// Error code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            GateError::Auth { kind } => kind.code(),
            GateError::Access {
                kind: AccessErrorKind::Forbidden { .. },
            } => "FORBIDDEN",
            GateError::Access {
                kind: AccessErrorKind::PrincipalNotFound { .. },
            } => "PRINCIPAL_NOT_FOUND",
            GateError::Access {
                kind: AccessErrorKind::InvalidCredentials,
            } => "INVALID_CREDENTIALS",
            GateError::Access {
                kind: AccessErrorKind::UsernameTaken { .. },
            } => "USERNAME_TAKEN",
            GateError::Validation { .. } => "VALIDATION_ERROR",
            GateError::Command {
                kind: CommandErrorKind::UnknownCommand { .. },
            } => "UNKNOWN_COMMAND",
            GateError::Command { .. } => "COMMAND_ERROR",
            GateError::Protocol { .. } => "PROTOCOL_ERROR",
            GateError::Config { .. }
            | GateError::Socket { .. }
            | GateError::Io(_)
            | GateError::Serialization(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP-style status code reported to clients.
    pub fn status_code(&self) -> u16 {
        match self {
            GateError::Auth { kind } => kind.status_code(),
            GateError::Access {
                kind: AccessErrorKind::Forbidden { .. },
            } => 403,
            GateError::Access {
                kind: AccessErrorKind::PrincipalNotFound { .. },
            } => 404,
            GateError::Access {
                kind: AccessErrorKind::InvalidCredentials,
            } => 401,
            GateError::Access {
                kind: AccessErrorKind::UsernameTaken { .. },
            } => 409,
            GateError::Validation { .. } | GateError::Protocol { .. } => 400,
            GateError::Command {
                kind: CommandErrorKind::UnknownCommand { .. },
            } => 404,
            _ => 500,
        }
    }

    /// Principal that attempted the failed operation, when the error names one.
    pub fn principal_id(&self) -> Option<u64> {
        match self {
            GateError::Access {
                kind: AccessErrorKind::Forbidden { principal_id, .. },
            } => Some(*principal_id),
            _ => None,
        }
    }

    /// Whether the message is safe to show the caller verbatim.
    pub fn is_caller_visible(&self) -> bool {
        self.status_code() < 500
    }
}

/// Result type alias for gate operations.
pub type GateResult<T> = Result<T, GateError>;
