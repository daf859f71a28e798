//! Configuration settings for the signgate daemon.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::GateError;
use crate::principal::password::check_hash_format;
use crate::principal::{Principal, PrincipalId, PrincipalSecret, Role};

/// Main configuration structure for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub socket: SocketConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    /// Principals known at startup.
    #[serde(default)]
    pub principals: Vec<PrincipalSeed>,
}

/// Socket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketConfig {
    /// Path to the Unix socket file.
    pub path: PathBuf,
    /// Socket file permissions (e.g., "0660").
    #[serde(default = "default_socket_permissions")]
    pub permissions: String,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Path to the token signing key file.
    pub token_key_path: PathBuf,
    /// Lifetime of issued bearer tokens in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
    /// Nonce time-to-live in seconds.
    #[serde(default = "default_nonce_ttl")]
    pub nonce_ttl_seconds: u64,
    /// Maximum distance between signing time and now, in seconds.
    #[serde(default = "default_timestamp_window")]
    pub timestamp_window_seconds: u64,
    /// Interval of the background nonce sweep in seconds.
    #[serde(default = "default_nonce_sweep_interval")]
    pub nonce_sweep_interval_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Limits configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Maximum concurrent connections.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    /// Socket read/write timeout in seconds.
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_seconds: u64,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Path to the audit log file.
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

/// A principal seeded from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PrincipalSeed {
    pub id: u64,
    pub secret: String,
    #[serde(default = "default_role")]
    pub role: Role,
    /// Login name; requires `password_hash`.
    #[serde(default)]
    pub username: Option<String>,
    /// Argon2 PHC string, never a plain password.
    #[serde(default)]
    pub password_hash: Option<String>,
}

impl PrincipalSeed {
    /// The `(username, password_hash)` pair, if the seed can log in.
    pub fn login(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password_hash) {
            (Some(username), Some(hash)) => Some((username.as_str(), hash.as_str())),
            _ => None,
        }
    }

    pub fn to_principal(&self) -> Principal {
        Principal {
            id: PrincipalId(self.id),
            secret: PrincipalSecret::from_string(self.secret.clone()),
            role: self.role,
        }
    }
}

// Default value functions
fn default_socket_permissions() -> String {
    "0660".to_string()
}

fn default_token_ttl() -> u64 {
    1800
}

fn default_nonce_ttl() -> u64 {
    300
}

fn default_timestamp_window() -> u64 {
    60
}

fn default_nonce_sweep_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_message_size() -> usize {
    1_048_576 // 1MB
}

fn default_max_concurrent() -> usize {
    100
}

fn default_socket_timeout() -> u64 {
    30
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("/var/log/signgate/audit.log")
}

fn default_role() -> Role {
    Role::Standard
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            max_concurrent_requests: default_max_concurrent(),
            socket_timeout_seconds: default_socket_timeout(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            log_path: default_audit_log_path(),
        }
    }
}

impl SecurityConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }

    pub fn nonce_ttl(&self) -> Duration {
        Duration::from_secs(self.nonce_ttl_seconds)
    }

    pub fn timestamp_window(&self) -> Duration {
        Duration::from_secs(self.timestamp_window_seconds)
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML file
    ///
    /// # Errors
    ///
    /// Returns `GateError::Config` if the file cannot be read, does not parse,
    /// or fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GateError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| GateError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let settings = Self::from_toml(&content).map_err(|e| GateError::Config {
            message: format!("Config file '{}': {}", path.display(), e),
        })?;

        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, GateError> {
        let settings: Settings = toml::from_str(content).map_err(|e| GateError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), GateError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(GateError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(GateError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        if !self.socket.permissions.chars().all(|c| c.is_ascii_digit()) {
            return Err(GateError::Config {
                message: format!(
                    "Invalid socket permissions '{}'. Must be octal (e.g., '0660')",
                    self.socket.permissions
                ),
            });
        }

        let security = &self.security;
        for (name, value) in [
            ("token_ttl_seconds", security.token_ttl_seconds),
            ("nonce_ttl_seconds", security.nonce_ttl_seconds),
            ("nonce_sweep_interval_seconds", security.nonce_sweep_interval_seconds),
        ] {
            if value == 0 {
                return Err(GateError::Config {
                    message: format!("security.{} must be greater than zero", name),
                });
            }
        }

        // A nonce must outlive the window in which its timestamp is accepted,
        // otherwise a captured request becomes replayable inside the window.
        if security.nonce_ttl_seconds < security.timestamp_window_seconds.saturating_mul(2) {
            return Err(GateError::Config {
                message: format!(
                    "security.nonce_ttl_seconds ({}) must be at least twice timestamp_window_seconds ({})",
                    security.nonce_ttl_seconds, security.timestamp_window_seconds
                ),
            });
        }

        let mut seen_ids = std::collections::HashSet::new();
        let mut seen_usernames = std::collections::HashSet::new();
        for seed in &self.principals {
            if !seen_ids.insert(seed.id) {
                return Err(GateError::Config {
                    message: format!("Duplicate principal id {}", seed.id),
                });
            }
            if seed.secret.len() < 32 {
                return Err(GateError::Config {
                    message: format!("Principal {} secret is shorter than 32 characters", seed.id),
                });
            }
            if seed.username.is_some() != seed.password_hash.is_some() {
                return Err(GateError::Config {
                    message: format!(
                        "Principal {} needs both username and password_hash, or neither",
                        seed.id
                    ),
                });
            }
            if let Some((username, hash)) = seed.login() {
                if !seen_usernames.insert(username) {
                    return Err(GateError::Config {
                        message: format!("Duplicate username '{}'", username),
                    });
                }
                check_hash_format(hash)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [socket]
        path = "/tmp/signgate.sock"

        [security]
        token_key_path = "/etc/signgate/token.key"
    "#;

    #[test]
    fn test_default_values() {
        let settings = Settings::from_toml(MINIMAL).unwrap();
        assert_eq!(settings.socket.permissions, "0660");
        assert_eq!(settings.security.token_ttl_seconds, 1800);
        assert_eq!(settings.security.nonce_ttl_seconds, 300);
        assert_eq!(settings.security.timestamp_window_seconds, 60);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, "pretty");
        assert!(settings.audit.enabled);
        assert!(settings.principals.is_empty());
    }

    #[test]
    fn test_principal_seeds() {
        let toml = format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [[principals]]
            id = 1
            secret = "0123456789abcdef0123456789abcdef"
            role = "administrator"

            [[principals]]
            id = 2
            secret = "fedcba9876543210fedcba9876543210"
            "#
        );
        let settings = Settings::from_toml(&toml).unwrap();
        assert_eq!(settings.principals.len(), 2);
        assert_eq!(settings.principals[0].role, Role::Administrator);
        assert_eq!(settings.principals[1].role, Role::Standard);
        assert_eq!(settings.principals[1].to_principal().id, PrincipalId(2));
    }

    #[test]
    fn test_rejects_duplicate_principal_ids() {
        let toml = format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [[principals]]
            id = 1
            secret = "0123456789abcdef0123456789abcdef"

            [[principals]]
            id = 1
            secret = "fedcba9876543210fedcba9876543210"
            "#
        );
        assert!(Settings::from_toml(&toml).is_err());
    }

    #[test]
    fn test_seed_login() {
        let toml = format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [[principals]]
            id = 1
            secret = "0123456789abcdef0123456789abcdef"
            username = "root"
            password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHRzYWx0$jCdFB4Pw0Y7Hs8mZRmeGUGZL2pY5zQg0f2hC2dVbEEk"
            "#
        );
        let settings = Settings::from_toml(&toml).unwrap();
        let (username, hash) = settings.principals[0].login().unwrap();
        assert_eq!(username, "root");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_rejects_seed_login_without_hash() {
        let toml = format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [[principals]]
            id = 1
            secret = "0123456789abcdef0123456789abcdef"
            username = "root"
            "#
        );
        assert!(Settings::from_toml(&toml).is_err());
    }

    #[test]
    fn test_rejects_plain_password_seed() {
        let toml = format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [[principals]]
            id = 1
            secret = "0123456789abcdef0123456789abcdef"
            username = "root"
            password_hash = "hunter2"
            "#
        );
        assert!(Settings::from_toml(&toml).is_err());
    }

    #[test]
    fn test_rejects_bad_log_level() {
        let toml = format!("{}\n[logging]\nlevel = \"loud\"\n", MINIMAL);
        assert!(Settings::from_toml(&toml).is_err());
    }

    #[test]
    fn test_rejects_nonce_ttl_shorter_than_window() {
        let toml = MINIMAL.replace(
            "token_key_path = \"/etc/signgate/token.key\"",
            "token_key_path = \"/etc/signgate/token.key\"\nnonce_ttl_seconds = 90",
        );
        assert!(Settings::from_toml(&toml).is_err());
    }
}
