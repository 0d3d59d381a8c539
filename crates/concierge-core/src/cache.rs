//! Time-limited response cache keyed by normalized query text.
//!
//! Keys are the SHA-256 digest of the trimmed, lowercased query, so
//! `"Hello"` and `"  hello  "` collide by construction. Expiry is lazy:
//! an entry is treated as gone only when a `get` observes it past its
//! `expires_at`, at which point it is evicted — no background timer.
//!
//! The cache is history-agnostic. Restricting caching to standalone
//! (history-free) queries is the orchestrator's policy, not this
//! component's.

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

/// A cached response with its expiry window.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: String,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Process-wide response cache with lazy TTL expiry.
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl_secs: i64,
}

/// Derive the cache key for a query: SHA-256 over the trimmed,
/// case-folded text.
pub fn cache_key(query: &str) -> String {
    let normalized = query.trim().to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl ResponseCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_secs,
        }
    }

    /// Look up a cached response. An expired entry is evicted and
    /// reported as absent.
    pub fn get(&self, query: &str) -> Option<String> {
        self.get_at(query, now_ts())
    }

    fn get_at(&self, query: &str, now: i64) -> Option<String> {
        let key = cache_key(query);
        let mut entries = self.entries.lock().unwrap();
        match entries.get(&key) {
            Some(entry) if now < entry.expires_at => Some(entry.response.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Store a response under the normalized query key.
    pub fn put(&self, query: &str, response: &str) {
        self.put_at(query, response, now_ts());
    }

    fn put_at(&self, query: &str, response: &str, now: i64) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            cache_key(query),
            CacheEntry {
                response: response.to_string(),
                created_at: now,
                expires_at: now + self.ttl_secs,
            },
        );
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Number of entries currently held (including not-yet-evicted
    /// expired ones).
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
