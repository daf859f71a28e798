//! Revoked bearer tokens.

use std::collections::HashSet;
use std::sync::RwLock;

/// Process-local set of revoked token strings.
///
/// Grows until restart and is not persisted: a restart forgets every
/// revocation, so revoked tokens become usable again until they expire.
pub struct RevocationSet {
    tokens: RwLock<HashSet<String>>,
}

impl RevocationSet {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashSet::new()),
        }
    }

    /// Revoke a token. Returns `false` if it was already revoked.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.to_string())
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RevocationSet {
    fn default() -> Self {
        Self::new()
    }
}
