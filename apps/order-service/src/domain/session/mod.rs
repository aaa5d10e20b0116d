//! Order Session Store
//!
//! Pending items per session, in arrival order. Sessions are created on
//! first append and removed by finalize or cancel. There is no expiry.
//!
//! The store has its own lock and never calls out while holding it.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::order::{OrderItem, SessionId};

/// Thread-safe map of open order sessions.
#[derive(Debug, Default)]
pub struct OrderSessionStore {
    sessions: Mutex<HashMap<SessionId, Vec<OrderItem>>>,
}

impl OrderSessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item, opening the session if needed.
    ///
    /// Returns the session's item count after the append.
    pub fn append(&self, session_id: &str, item: OrderItem) -> usize {
        let mut sessions = self.sessions.lock();
        let items = sessions.entry(session_id.to_string()).or_default();
        items.push(item);
        items.len()
    }

    /// Remove a session. Returns whether it was open.
    pub fn clear(&self, session_id: &str) -> bool {
        self.sessions.lock().remove(session_id).is_some()
    }

    /// Snapshot of a session's items. Empty if the session is not open.
    #[must_use]
    pub fn items(&self, session_id: &str) -> Vec<OrderItem> {
        self.sessions
            .lock()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Check if no session is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
