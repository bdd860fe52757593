//! Per-session in-flight send tracking.
//!
//! While a chat turn is being processed, a second send of the byte-identical
//! message text for the same session is rejected. A different message for the
//! same session is allowed through.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

type InFlightSet = Arc<Mutex<HashSet<(String, String)>>>;

/// Tracks which (session, message) pairs are currently being processed.
#[derive(Clone, Default)]
pub struct ChatSessions {
    in_flight: InFlightSet,
}

fn locked(set: &InFlightSet) -> MutexGuard<'_, HashSet<(String, String)>> {
    match set.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl ChatSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a message as in flight for a session.
    ///
    /// Returns `None` when the identical message text is already in flight for
    /// that session. Otherwise returns a guard; dropping it releases the slot,
    /// so abandoned turns (errors, disconnects) never wedge the session.
    pub fn begin(&self, session: &str, message: &str) -> Option<InFlightGuard> {
        let key = (session.to_string(), message.to_string());
        let mut set = locked(&self.in_flight);
        if set.contains(&key) {
            return None;
        }
        set.insert(key.clone());
        Some(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            key,
        })
    }
}

/// Releases the in-flight slot on drop.
pub struct InFlightGuard {
    in_flight: InFlightSet,
    key: (String, String),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        locked(&self.in_flight).remove(&self.key);
    }
}
