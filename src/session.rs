use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use tracing::debug;

/// A registered search query, addressable by its opaque key.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub key: String,
    pub query: String,
    pub created_at: Instant,
}

/// Process-wide map from opaque session keys to the free-text queries they
/// stand in for. Entries expire after a fixed TTL; expiry is not sliding.
///
/// Single-process deployment is assumed: keys created here are not resolvable
/// by other instances. Clients recover from that (and from plain expiry) with
/// the `fallback_q` they staged at search time.
#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<Mutex<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Registers a query and returns its entry. Rejects blank queries.
    pub fn create(&self, query: &str) -> Result<SessionEntry> {
        let query = query.trim();
        if query.is_empty() {
            anyhow::bail!("Search query cannot be empty");
        }

        let entry = SessionEntry {
            key: generate_key(),
            query: query.to_string(),
            created_at: Instant::now(),
        };

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Session store lock poisoned"))?;
        entries.insert(entry.key.clone(), entry.clone());

        debug!(key = %entry.key, "Registered search session");
        Ok(entry)
    }

    /// Pure lookup; does not renew the TTL. An expired entry is dropped on
    /// access and reported as absent.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;

        match entries.get(key) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => Some(entry.query.clone()),
            Some(_) => {
                entries.remove(key);
                debug!(key = %key, "Search session expired");
                None
            }
            None => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry past its TTL. Idempotent; called by the sweep task
    /// so abandoned sessions do not accumulate between lookups.
    pub fn sweep(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        }
    }

    /// Spawns a background task that sweeps expired entries periodically.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                store.sweep();
            }
        })
    }
}

/// 16 lowercase hex characters. Collision-free in practice over the store's
/// lifetime; not required to be unguessable.
fn generate_key() -> String {
    format!("{:016x}", rand::random::<u64>())
}
