//! Unix socket listener.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UnixListener;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, info, warn};

use crate::audit::AuditLogger;
use crate::auth::{AuthenticationGate, NonceLedger, RevocationSet, SignatureVerifier, TokenCodec};
use crate::commands::{CommandRegistry, GateServices};
use crate::config::Settings;
use crate::error::{GateError, ProtocolErrorKind};
use crate::principal::{MemoryPrincipalStore, PrincipalId};

use super::handle_connection;

/// Connection metrics for monitoring.
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    pub requests_total: AtomicU64,
    pub requests_failed: AtomicU64,
    pub active_connections: AtomicUsize,
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, success: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }
}

/// Unix socket server hosting the authentication gate.
pub struct SocketListener {
    listener: UnixListener,
    settings: Arc<Settings>,
    command_registry: Arc<CommandRegistry>,
    audit_logger: Option<Arc<AuditLogger>>,
    metrics: Arc<ConnectionMetrics>,
    gate: Arc<AuthenticationGate>,
    principals: Arc<MemoryPrincipalStore>,
    connection_semaphore: Arc<Semaphore>,
}

impl SocketListener {
    /// Build the gate from `settings` and bind the socket.
    ///
    /// Seeds the principal store (with logins, where configured) and starts
    /// the nonce sweep.
    ///
    /// # Errors
    ///
    /// * `GateError::Config` - token key unreadable or too permissive, or a
    ///   seeded principal or username collides
    /// * `GateError::Socket` - the socket path is a symlink or cannot be bound
    pub async fn bind(settings: Arc<Settings>) -> Result<Self, GateError> {
        let security = &settings.security;

        let key = TokenCodec::load_key(&security.token_key_path)?;
        let tokens = Arc::new(TokenCodec::new(
            &key,
            security.token_ttl(),
            Arc::new(RevocationSet::new()),
        ));

        let nonces = Arc::new(NonceLedger::new(security.nonce_ttl()));
        nonces.start_sweep_task(Duration::from_secs(security.nonce_sweep_interval_seconds));
        let verifier = SignatureVerifier::new(nonces, security.timestamp_window());

        let principals = Arc::new(MemoryPrincipalStore::new());
        for seed in &settings.principals {
            principals.insert(seed.to_principal())?;
            if let Some((username, password_hash)) = seed.login() {
                principals.add_login(PrincipalId(seed.id), username, password_hash)?;
            }
        }
        info!(count = principals.len(), "Principals seeded");

        let gate = Arc::new(AuthenticationGate::new(
            Arc::clone(&tokens),
            verifier,
            principals.clone(),
        ));
        info!(
            token_ttl_seconds = security.token_ttl_seconds,
            nonce_ttl_seconds = security.nonce_ttl_seconds,
            timestamp_window_seconds = security.timestamp_window_seconds,
            "Authentication gate ready"
        );

        let metrics = Arc::new(ConnectionMetrics::new());

        let connection_semaphore = Arc::new(Semaphore::new(settings.limits.max_concurrent_requests));
        info!(
            max_connections = settings.limits.max_concurrent_requests,
            "Connection limiting enabled"
        );

        let command_registry = Arc::new(CommandRegistry::new(GateServices {
            gate: Arc::clone(&gate),
            principals: Arc::clone(&principals),
            metrics: Arc::clone(&metrics),
        }));

        let audit_logger = if settings.audit.enabled {
            match AuditLogger::new(&settings.audit.log_path) {
                Ok(logger) => {
                    info!(
                        path = %settings.audit.log_path.display(),
                        "Audit logging enabled"
                    );
                    Some(Arc::new(logger))
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        path = %settings.audit.log_path.display(),
                        "Failed to create audit logger, audit logging disabled"
                    );
                    None
                }
            }
        } else {
            info!("Audit logging disabled");
            None
        };

        let listener = Self::bind_socket(&settings.socket.path)?;
        Self::set_socket_permissions(&settings.socket.path, &settings.socket.permissions)?;

        info!(path = %settings.socket.path.display(), "Socket listener bound");

        Ok(Self {
            listener,
            settings,
            command_registry,
            audit_logger,
            metrics,
            gate,
            principals,
            connection_semaphore,
        })
    }

    fn bind_socket(socket_path: &Path) -> Result<UnixListener, GateError> {
        // Never follow a symlink when clearing a stale socket
        if let Ok(metadata) = std::fs::symlink_metadata(socket_path) {
            if metadata.file_type().is_symlink() {
                return Err(GateError::Socket {
                    message: format!(
                        "Socket path {} is a symlink, refusing to remove",
                        socket_path.display()
                    ),
                });
            }

            std::fs::remove_file(socket_path).map_err(|e| GateError::Socket {
                message: format!(
                    "Failed to remove existing socket file {}: {}",
                    socket_path.display(),
                    e
                ),
            })?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GateError::Socket {
                message: format!(
                    "Failed to create socket directory {}: {}",
                    parent.display(),
                    e
                ),
            })?;
        }

        UnixListener::bind(socket_path).map_err(|e| GateError::Socket {
            message: format!("Failed to bind to socket {}: {}", socket_path.display(), e),
        })
    }

    fn set_socket_permissions(path: &Path, permissions_str: &str) -> Result<(), GateError> {
        let mode = u32::from_str_radix(permissions_str, 8).map_err(|e| GateError::Socket {
            message: format!("Invalid socket permissions '{}': {}", permissions_str, e),
        })?;

        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
            GateError::Socket {
                message: format!(
                    "Failed to set socket permissions on {}: {}",
                    path.display(),
                    e
                ),
            }
        })
    }

    pub fn metrics(&self) -> Arc<ConnectionMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn gate(&self) -> Arc<AuthenticationGate> {
        Arc::clone(&self.gate)
    }

    pub fn principals(&self) -> Arc<MemoryPrincipalStore> {
        Arc::clone(&self.principals)
    }

    /// Accept connections until `shutdown` is notified.
    ///
    /// Connections already accepted keep running; see [`Self::wait_for_drain`].
    pub async fn run(&self, shutdown: Arc<Notify>) -> Result<(), GateError> {
        info!("Socket listener running, waiting for connections...");

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            let permit = match self.connection_semaphore.clone().try_acquire_owned() {
                                Ok(permit) => permit,
                                Err(_) => {
                                    warn!(
                                        max = self.settings.limits.max_concurrent_requests,
                                        "Connection limit reached, rejecting connection"
                                    );
                                    continue;
                                }
                            };

                            let settings = Arc::clone(&self.settings);
                            let command_registry = Arc::clone(&self.command_registry);
                            let audit_logger = self.audit_logger.clone();
                            let metrics = Arc::clone(&self.metrics);

                            metrics.active_connections.fetch_add(1, Ordering::Relaxed);
                            debug!(active = metrics.active(), "New connection accepted");

                            tokio::spawn(async move {
                                let _permit = permit;
                                let result = handle_connection(
                                    stream,
                                    settings,
                                    command_registry,
                                    audit_logger,
                                    Arc::clone(&metrics),
                                )
                                .await;

                                if let Err(e) = &result {
                                    if !matches!(
                                        e,
                                        GateError::Protocol {
                                            kind: ProtocolErrorKind::ConnectionClosed
                                        }
                                    ) {
                                        error!(error = %e, "Connection handler error");
                                    }
                                }

                                metrics.active_connections.fetch_sub(1, Ordering::Relaxed);
                                debug!(
                                    active = metrics.active(),
                                    success = result.is_ok(),
                                    "Connection closed"
                                );
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = shutdown.notified() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Wait until no connection is active.
    pub async fn wait_for_drain(&self) {
        let poll_interval = Duration::from_millis(100);

        while self.metrics.active() > 0 {
            debug!(active = self.metrics.active(), "Waiting for connections to drain");
            tokio::time::sleep(poll_interval).await;
        }

        info!("All connections drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counters() {
        let metrics = ConnectionMetrics::new();
        metrics.record_request(true);
        metrics.record_request(false);
        metrics.record_request(true);

        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.failed_requests(), 1);
        assert_eq!(metrics.active(), 0);
    }
}
