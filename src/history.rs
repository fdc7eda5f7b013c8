//! Session-scoped conversation history.
//!
//! Each conversation lives under its own session id, so concurrent requests
//! for unrelated conversations never interleave turns. A session's log is
//! append-only and uncapped; only the read-side window bounds what reaches a
//! prompt. Sessions themselves are evicted least-recently-used above a
//! configured count. Nothing here survives a restart.

use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::ConversationTurn;

pub struct SessionStore {
    inner: Mutex<Inner>,
    max_sessions: usize,
}

struct Inner {
    sessions: HashMap<String, Session>,
    /// Logical clock for LRU ordering.
    clock: u64,
}

struct Session {
    turns: Vec<ConversationTurn>,
    last_used: u64,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                clock: 0,
            }),
            max_sessions,
        }
    }

    /// Return the session id to use for a request: the requested id if that
    /// session exists, otherwise a fresh one. Touches the session for LRU and
    /// evicts the stalest session when over capacity.
    pub fn resolve(&self, requested: Option<&str>) -> String {
        let mut inner = self.inner.lock().expect("session store lock poisoned");
        inner.clock += 1;
        let now = inner.clock;

        let id = match requested {
            Some(id) if inner.sessions.contains_key(id) => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        if !inner.sessions.contains_key(&id) && inner.sessions.len() >= self.max_sessions {
            if let Some(stalest) = inner
                .sessions
                .iter()
                .min_by_key(|(_, s)| s.last_used)
                .map(|(id, _)| id.clone())
            {
                tracing::debug!(session = %stalest, "evicting least-recently-used session");
                inner.sessions.remove(&stalest);
            }
        }

        let session = inner.sessions.entry(id.clone()).or_insert(Session {
            turns: Vec::new(),
            last_used: now,
        });
        session.last_used = now;

        id
    }

    /// O(1) append. No deduplication, no cap on the log.
    pub fn append(&self, session_id: &str, turn: ConversationTurn) {
        let mut inner = self.inner.lock().expect("session store lock poisoned");
        inner.clock += 1;
        let now = inner.clock;
        let session = inner
            .sessions
            .entry(session_id.to_string())
            .or_insert(Session {
                turns: Vec::new(),
                last_used: now,
            });
        session.last_used = now;
        session.turns.push(turn);
    }

    /// The last `n` turns of a session in insertion order; fewer if the log
    /// is shorter, empty for an unknown session.
    pub fn recent_window(&self, session_id: &str, n: usize) -> Vec<ConversationTurn> {
        let inner = self.inner.lock().expect("session store lock poisoned");
        match inner.sessions.get(session_id) {
            Some(session) => {
                let start = session.turns.len().saturating_sub(n);
                session.turns[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Total turn count for a session. Used by tests and diagnostics.
    pub fn turn_count(&self, session_id: &str) -> usize {
        let inner = self.inner.lock().expect("session store lock poisoned");
        inner
            .sessions
            .get(session_id)
            .map(|s| s.turns.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_window_returns_min_n_m() {
        let store = SessionStore::new(8);
        let id = store.resolve(None);
        for i in 0..7 {
            store.append(&id, ConversationTurn::user(format!("turn {}", i)));
        }

        let window = store.recent_window(&id, 5);
        assert_eq!(window.len(), 5);
        assert_eq!(window[0].content, "turn 2");
        assert_eq!(window[4].content, "turn 6");

        let all = store.recent_window(&id, 100);
        assert_eq!(all.len(), 7);
        assert_eq!(all[0].content, "turn 0");
    }

    #[test]
    fn test_unknown_session_is_empty() {
        let store = SessionStore::new(8);
        assert!(store.recent_window("nope", 5).is_empty());
        assert_eq!(store.turn_count("nope"), 0);
    }

    #[test]
    fn test_resolve_keeps_existing_session() {
        let store = SessionStore::new(8);
        let id = store.resolve(None);
        store.append(&id, ConversationTurn::user("hi"));
        let resolved = store.resolve(Some(&id));
        assert_eq!(resolved, id);
        assert_eq!(store.turn_count(&id), 1);
    }

    #[test]
    fn test_resolve_unknown_id_creates_fresh_session() {
        let store = SessionStore::new(8);
        let resolved = store.resolve(Some("never-seen"));
        assert_ne!(resolved, "never-seen");
    }

    #[test]
    fn test_lru_eviction() {
        let store = SessionStore::new(2);
        let a = store.resolve(None);
        let b = store.resolve(None);
        store.append(&a, ConversationTurn::user("a"));
        store.append(&b, ConversationTurn::user("b"));

        // Touch a so b becomes the stalest, then open a third session.
        store.resolve(Some(&a));
        let _c = store.resolve(None);

        assert_eq!(store.turn_count(&a), 1);
        assert_eq!(store.turn_count(&b), 0, "b should have been evicted");
    }
}
