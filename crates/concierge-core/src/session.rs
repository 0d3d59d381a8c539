//! Conversation session store with sliding-window history and idle expiry.
//!
//! A process-wide table of sessions behind a single `Mutex`: every
//! mutating operation (resolve, append, sweep, remove) takes the lock
//! once for its whole critical section, so two concurrent requests for
//! the same session id can never interleave a partial append, and a
//! sweep can never race a resolve of the session being expired.
//!
//! Invariants:
//! - History length never exceeds the configured window; oldest turns
//!   are dropped first.
//! - `last_activity` is refreshed on every access.
//! - A session idle for longer than the TTL is purged before any read
//!   or write; `resolve` sweeps under the same lock acquisition.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{ChatRole, ChatTurn};

/// Deletion or lookup of a session id that does not exist (or has
/// already expired).
#[derive(Debug, Error)]
#[error("session not found: {id}")]
pub struct SessionNotFound {
    pub id: String,
}

/// One conversation session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub history: Vec<ChatTurn>,
    pub created_at: i64,
    pub last_activity: i64,
}

/// Process-wide session table.
///
/// `window` bounds the stored history length, `ttl_secs` is the idle
/// expiry, and `context_turns` is how many recent turns
/// [`render_context`](SessionStore::render_context) formats for prompt
/// injection (`context_turns <= window`).
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    window: usize,
    ttl_secs: i64,
    context_turns: usize,
}

impl SessionStore {
    pub fn new(window: usize, ttl_secs: i64, context_turns: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            window,
            ttl_secs,
            context_turns: context_turns.min(window),
        }
    }

    /// Resolve a session id to a live session, minting a new one when the
    /// id is absent, unknown, or expired.
    ///
    /// Returns the (possibly new) session id and a snapshot of its
    /// history. Expired sessions are swept and `last_activity` refreshed
    /// under the same lock acquisition.
    pub fn resolve(&self, session_id: Option<&str>) -> (String, Vec<ChatTurn>) {
        self.resolve_at(session_id, now_ts())
    }

    fn resolve_at(&self, session_id: Option<&str>, now: i64) -> (String, Vec<ChatTurn>) {
        let mut sessions = self.sessions.lock().unwrap();
        Self::sweep_locked(&mut sessions, self.ttl_secs, now);

        if let Some(id) = session_id {
            if let Some(session) = sessions.get_mut(id) {
                session.last_activity = now;
                return (session.id.clone(), session.history.clone());
            }
        }

        let id = Uuid::new_v4().to_string();
        sessions.insert(
            id.clone(),
            Session {
                id: id.clone(),
                history: Vec::new(),
                created_at: now,
                last_activity: now,
            },
        );
        (id, Vec::new())
    }

    /// Append one turn, truncating the history to the last `window` turns.
    ///
    /// Appending to an unknown id is a no-op: the session may have been
    /// swept between resolve and append, and a turn for a dead
    /// conversation is not worth resurrecting.
    pub fn append(&self, session_id: &str, role: ChatRole, content: &str) {
        self.append_at(session_id, role, content, now_ts());
    }

    fn append_at(&self, session_id: &str, role: ChatRole, content: &str, now: i64) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(session_id) {
            session.history.push(ChatTurn {
                role,
                content: content.to_string(),
                timestamp: now,
            });
            if session.history.len() > self.window {
                let excess = session.history.len() - self.window;
                session.history.drain(..excess);
            }
            session.last_activity = now;
        }
    }

    /// Remove all sessions idle for longer than the TTL.
    pub fn sweep(&self) {
        let mut sessions = self.sessions.lock().unwrap();
        Self::sweep_locked(&mut sessions, self.ttl_secs, now_ts());
    }

    fn sweep_locked(sessions: &mut HashMap<String, Session>, ttl_secs: i64, now: i64) {
        sessions.retain(|_, s| now - s.last_activity <= ttl_secs);
    }

    /// Format the most recent `context_turns` turns as alternating
    /// `User:` / `Assistant:` lines for prompt injection.
    ///
    /// Returns an empty string for an unknown session or one with no
    /// history.
    pub fn render_context(&self, session_id: &str) -> String {
        let sessions = self.sessions.lock().unwrap();
        let Some(session) = sessions.get(session_id) else {
            return String::new();
        };
        let start = session.history.len().saturating_sub(self.context_turns);
        session.history[start..]
            .iter()
            .map(|turn| format!("{}: {}", turn.role.as_str(), turn.content))
            .collect::<Vec<String>>()
            .join("\n")
    }

    /// Explicitly delete a session.
    pub fn remove(&self, session_id: &str) -> Result<(), SessionNotFound> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| SessionNotFound {
                id: session_id.to_string(),
            })
    }

    /// Number of live (unswept) sessions.
    pub fn active_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Test hook: backdate a session's `last_activity`.
    #[cfg(test)]
    fn set_last_activity(&self, session_id: &str, ts: i64) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(s) = sessions.get_mut(session_id) {
            s.last_activity = ts;
        }
    }
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_mints_new_session() {
        let store = SessionStore::new(10, 1800, 6);
        let (id, history) = store.resolve(None);
        assert!(!id.is_empty());
        assert!(history.is_empty());
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn test_resolve_unknown_id_mints_fresh() {
        let store = SessionStore::new(10, 1800, 6);
        let (id, _) = store.resolve(Some("does-not-exist"));
        assert_ne!(id, "does-not-exist");
    }

    #[test]
    fn test_resolve_returns_existing_history() {
        let store = SessionStore::new(10, 1800, 6);
        let (id, _) = store.resolve(None);
        store.append(&id, ChatRole::User, "hello");
        store.append(&id, ChatRole::Assistant, "hi there");

        let (resolved, history) = store.resolve(Some(&id));
        assert_eq!(resolved, id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].content, "hi there");
    }

    #[test]
    fn test_sliding_window_keeps_most_recent() {
        let window = 10;
        let store = SessionStore::new(window, 1800, 6);
        let (id, _) = store.resolve(None);
        for i in 0..window + 5 {
            store.append(&id, ChatRole::User, &format!("turn {}", i));
        }
        let (_, history) = store.resolve(Some(&id));
        assert_eq!(history.len(), window);
        assert_eq!(history[0].content, "turn 5");
        assert_eq!(history[window - 1].content, "turn 14");
    }

    #[test]
    fn test_expired_session_swept() {
        let store = SessionStore::new(10, 1800, 6);
        let (id, _) = store.resolve(None);
        store.set_last_activity(&id, now_ts() - 1801);
        store.sweep();
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn test_resolve_of_expired_session_mints_new() {
        let store = SessionStore::new(10, 1800, 6);
        let (id, _) = store.resolve(None);
        store.append(&id, ChatRole::User, "stale turn");
        store.set_last_activity(&id, now_ts() - 9999);

        let (new_id, history) = store.resolve(Some(&id));
        assert_ne!(new_id, id);
        assert!(history.is_empty());
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn test_render_context_formats_roles() {
        let store = SessionStore::new(10, 1800, 6);
        let (id, _) = store.resolve(None);
        store.append(&id, ChatRole::User, "what services do you offer?");
        store.append(&id, ChatRole::Assistant, "we offer RPO and BPO.");

        let context = store.render_context(&id);
        assert_eq!(
            context,
            "User: what services do you offer?\nAssistant: we offer RPO and BPO."
        );
    }

    #[test]
    fn test_render_context_limited_to_context_turns() {
        let store = SessionStore::new(10, 1800, 2);
        let (id, _) = store.resolve(None);
        for i in 0..5 {
            store.append(&id, ChatRole::User, &format!("m{}", i));
        }
        let context = store.render_context(&id);
        assert_eq!(context, "User: m3\nUser: m4");
    }

    #[test]
    fn test_render_context_empty_for_no_history() {
        let store = SessionStore::new(10, 1800, 6);
        let (id, _) = store.resolve(None);
        assert_eq!(store.render_context(&id), "");
        assert_eq!(store.render_context("unknown"), "");
    }

    #[test]
    fn test_remove_unknown_session_errors() {
        let store = SessionStore::new(10, 1800, 6);
        let err = store.remove("nope").unwrap_err();
        assert_eq!(err.id, "nope");
    }

    #[test]
    fn test_remove_existing_session() {
        let store = SessionStore::new(10, 1800, 6);
        let (id, _) = store.resolve(None);
        store.remove(&id).unwrap();
        assert_eq!(store.active_count(), 0);
    }
}
