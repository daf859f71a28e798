//! In-memory principal directory.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, info};

use crate::error::{AccessErrorKind, GateError};

use super::password::{check_hash_format, hash_password, verify_password};
use super::{Principal, PrincipalId, PrincipalSecret, PrincipalStore, Role};

struct Login {
    principal_id: PrincipalId,
    password_hash: String,
}

#[derive(Default)]
struct Directory {
    by_id: HashMap<PrincipalId, Principal>,
    /// secret -> id
    by_secret: HashMap<String, PrincipalId>,
    by_username: HashMap<String, Login>,
    next_id: u64,
}

/// Thread-safe in-memory principal store.
pub struct MemoryPrincipalStore {
    inner: RwLock<Directory>,
}

impl MemoryPrincipalStore {
    /// Create an empty store. Ids are allocated from 1.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Directory {
                next_id: 1,
                ..Directory::default()
            }),
        }
    }

    /// Insert a known principal (e.g. seeded from configuration).
    ///
    /// Fails if the id or the secret is already taken.
    pub fn insert(&self, principal: Principal) -> Result<(), GateError> {
        let mut dir = self.inner.write().unwrap_or_else(|e| e.into_inner());

        if dir.by_id.contains_key(&principal.id)
            || dir.by_secret.contains_key(principal.secret.as_str())
        {
            return Err(GateError::Config {
                message: format!("Duplicate principal id or secret for id {}", principal.id),
            });
        }

        dir.next_id = dir.next_id.max(principal.id.0 + 1);
        dir.by_secret
            .insert(principal.secret.as_str().to_string(), principal.id);
        dir.by_id.insert(principal.id, principal);
        Ok(())
    }

    /// Attach a login to an existing principal (e.g. seeded from configuration).
    ///
    /// # Errors
    ///
    /// Returns `GateError::Config` if the principal is unknown, the username
    /// is taken or `password_hash` is not a PHC string.
    pub fn add_login(
        &self,
        principal_id: PrincipalId,
        username: &str,
        password_hash: &str,
    ) -> Result<(), GateError> {
        check_hash_format(password_hash)?;

        let mut dir = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if !dir.by_id.contains_key(&principal_id) {
            return Err(GateError::Config {
                message: format!("Login '{}' names unknown principal {}", username, principal_id),
            });
        }
        if dir.by_username.contains_key(username) {
            return Err(GateError::Config {
                message: format!("Duplicate username '{}'", username),
            });
        }

        dir.by_username.insert(
            username.to_string(),
            Login {
                principal_id,
                password_hash: password_hash.to_string(),
            },
        );
        Ok(())
    }

    /// Register a new standard principal with a freshly generated secret.
    ///
    /// The password is stored only as an Argon2id hash.
    ///
    /// # Arguments
    ///
    /// * `username` - Login name, unique across the store
    /// * `password` - Plain password used by `verify_login`
    ///
    /// # Errors
    ///
    /// Returns `AccessErrorKind::UsernameTaken` if the name is in use.
    pub fn register(&self, username: &str, password: &str) -> Result<Principal, GateError> {
        let password_hash = hash_password(password)?;
        let mut secret = PrincipalSecret::generate()?;

        let mut dir = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if dir.by_username.contains_key(username) {
            return Err(GateError::Access {
                kind: AccessErrorKind::UsernameTaken {
                    username: username.to_string(),
                },
            });
        }
        while dir.by_secret.contains_key(secret.as_str()) {
            secret = PrincipalSecret::generate()?;
        }

        let id = PrincipalId(dir.next_id);
        dir.next_id += 1;

        let principal = Principal {
            id,
            secret,
            role: Role::Standard,
        };
        dir.by_secret
            .insert(principal.secret.as_str().to_string(), id);
        dir.by_id.insert(id, principal.clone());
        dir.by_username.insert(
            username.to_string(),
            Login {
                principal_id: id,
                password_hash,
            },
        );

        info!(principal_id = %id, username, "Principal registered");
        Ok(principal)
    }

    /// Resolve a principal from its username and password.
    ///
    /// An unknown username and a wrong password are indistinguishable to
    /// the caller.
    ///
    /// # Errors
    ///
    /// Returns `AccessErrorKind::InvalidCredentials` on any mismatch.
    pub fn verify_login(&self, username: &str, password: &str) -> Result<Principal, GateError> {
        let invalid = || GateError::Access {
            kind: AccessErrorKind::InvalidCredentials,
        };

        let (principal_id, password_hash) = {
            let dir = self.inner.read().unwrap_or_else(|e| e.into_inner());
            let login = dir.by_username.get(username).ok_or_else(invalid)?;
            (login.principal_id, login.password_hash.clone())
        };

        // Hashing is slow; the lock is not held across it
        if !verify_password(password, &password_hash)? {
            debug!(username, "Password mismatch");
            return Err(invalid());
        }

        self.lookup_by_id(principal_id).ok_or_else(invalid)
    }

    /// Change a principal's role. Only administrators may do this.
    ///
    /// # Errors
    ///
    /// `AccessErrorKind::Forbidden` naming the actor when it is not an
    /// administrator, `AccessErrorKind::PrincipalNotFound` for an unknown target.
    pub fn set_role(
        &self,
        actor: &Principal,
        target: PrincipalId,
        role: Role,
    ) -> Result<Principal, GateError> {
        if !actor.is_administrator() {
            return Err(GateError::Access {
                kind: AccessErrorKind::Forbidden {
                    principal_id: actor.id.0,
                    action: "change roles".to_string(),
                },
            });
        }

        let mut dir = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let principal = dir.by_id.get_mut(&target).ok_or(GateError::Access {
            kind: AccessErrorKind::PrincipalNotFound {
                principal_id: target.0,
            },
        })?;
        principal.role = role;

        debug!(
            actor = %actor.id,
            principal_id = %target,
            role = role.as_str(),
            "Principal role changed"
        );
        Ok(principal.clone())
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .by_id
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryPrincipalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PrincipalStore for MemoryPrincipalStore {
    fn lookup_by_id(&self, id: PrincipalId) -> Option<Principal> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .by_id
            .get(&id)
            .cloned()
    }

    fn lookup_by_api_key(&self, secret: &str) -> Option<Principal> {
        let dir = self.inner.read().unwrap_or_else(|e| e.into_inner());
        dir.by_secret
            .get(secret)
            .and_then(|id| dir.by_id.get(id))
            .cloned()
    }
}
