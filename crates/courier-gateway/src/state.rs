//! OAuth CSRF-state issuance and verification.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

/// Default lifetime of an issued state.
const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Issues random `state` values for the OAuth authorize redirect and
/// verifies them at callback time.
///
/// A state is single-use: consuming it removes it, so a replayed callback
/// fails even inside the TTL window.
pub struct OAuthStateStore {
    states: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl OAuthStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Issues a fresh state value. Expired entries are pruned on the way.
    pub fn issue(&self) -> String {
        let state = Uuid::new_v4().to_string();
        let mut states = self.states.lock();
        let ttl = self.ttl;
        states.retain(|_, issued| issued.elapsed() <= ttl);
        states.insert(state.clone(), Instant::now());
        state
    }

    /// Consumes a state value, returning whether it was valid and fresh.
    pub fn consume(&self, state: &str) -> bool {
        match self.states.lock().remove(state) {
            Some(issued) => issued.elapsed() <= self.ttl,
            None => false,
        }
    }

    /// Number of outstanding states (expired entries included until the
    /// next prune).
    pub fn outstanding(&self) -> usize {
        self.states.lock().len()
    }
}
