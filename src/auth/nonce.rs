//! In-memory nonce ledger for replay attack prevention.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::error::AuthErrorKind;

use super::unix_now;

/// Default time-to-live for a recorded nonce.
pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(300);

#[derive(Default)]
struct Ledger {
    /// nonce -> expiry (unix seconds)
    live: HashMap<String, u64>,
    /// Expiry index, earliest first.
    expiries: BinaryHeap<Reverse<(u64, String)>>,
}

impl Ledger {
    fn evict_expired(&mut self, now: u64) -> usize {
        let mut evicted = 0;
        while let Some(Reverse((expires_at, _))) = self.expiries.peek() {
            if *expires_at > now {
                break;
            }
            let Some(Reverse((expires_at, nonce))) = self.expiries.pop() else {
                break;
            };
            if self.live.get(&nonce) == Some(&expires_at) {
                self.live.remove(&nonce);
                evicted += 1;
            }
        }
        evicted
    }
}

/// Thread-safe nonce ledger with TTL-based expiry.
///
/// Eviction is lazy: every check first drops entries whose expiry is at or
/// before `now`. A min-heap keyed on expiry keeps the sweep proportional to
/// the number of entries actually expiring.
pub struct NonceLedger {
    inner: Mutex<Ledger>,
    ttl: Duration,
}

impl NonceLedger {
    /// Create a new ledger with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Ledger::default()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Record `nonce` if it is not live, otherwise report a replay.
    ///
    /// # Errors
    ///
    /// Returns `AuthErrorKind::ReplayDetected` if the nonce was seen within
    /// the TTL.
    pub fn check_and_record(&self, nonce: &str, now: u64) -> Result<(), AuthErrorKind> {
        let mut ledger = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        ledger.evict_expired(now);

        if ledger.live.contains_key(nonce) {
            return Err(AuthErrorKind::ReplayDetected);
        }

        let expires_at = now.saturating_add(self.ttl.as_secs());
        ledger.live.insert(nonce.to_string(), expires_at);
        ledger
            .expiries
            .push(Reverse((expires_at, nonce.to_string())));

        Ok(())
    }

    /// Remove every entry whose expiry is at or before `now`.
    pub fn evict_expired(&self, now: u64) -> usize {
        let mut ledger = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        ledger.evict_expired(now)
    }

    /// Number of live nonces (for monitoring).
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .live
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a background sweep task.
    ///
    /// Checks already evict lazily; this only bounds memory on an idle gate.
    pub fn start_sweep_task(self: &Arc<Self>, interval: Duration) {
        let ledger = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            loop {
                interval_timer.tick().await;
                let evicted = ledger.evict_expired(unix_now());
                if evicted > 0 {
                    debug!(evicted, remaining = ledger.len(), "Swept expired nonces");
                }
            }
        });
    }
}

impl Default for NonceLedger {
    fn default() -> Self {
        Self::new(DEFAULT_NONCE_TTL)
    }
}
