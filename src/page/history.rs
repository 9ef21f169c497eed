use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::clients::pddikti::Resource;

/// Durable per-resource search history: most-recent first, no duplicates,
/// bounded length. Backed by an in-memory map keyed the way the browser
/// storage keys are (`pddikti_<resource>_history`), shared across pages.
#[derive(Clone, Default)]
pub struct HistoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<String>>>>,
    limit: usize,
}

impl HistoryStore {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            limit,
        }
    }

    fn storage_key(resource: Resource) -> String {
        format!("pddikti_{}_history", resource.as_str())
    }

    #[must_use]
    pub fn list(&self, resource: Resource) -> Vec<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|e| e.get(&Self::storage_key(resource)).cloned())
            .unwrap_or_default()
    }

    /// Dedupe, prepend, cap. Returns the updated list.
    pub fn record(&self, resource: Resource, query: &str) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() {
            return self.list(resource);
        }

        let Ok(mut entries) = self.entries.lock() else {
            return Vec::new();
        };

        let history = entries.entry(Self::storage_key(resource)).or_default();
        history.retain(|q| q != query);
        history.insert(0, query.to_string());
        history.truncate(self.limit);
        history.clone()
    }

    pub fn clear(&self, resource: Resource) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&Self::storage_key(resource));
        }
    }
}
