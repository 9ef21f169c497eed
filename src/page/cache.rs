use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const RESULT_PREFIX: &str = "search_results_";
const STAGING_PREFIX: &str = "search_query_";

/// Results cached for one session key. If present, `query` matches what the
/// server resolved for that key at fetch time; once the key expires
/// server-side this is best-effort, which is exactly why the staged fallback
/// query exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResults {
    pub query: String,
    pub data: Vec<Value>,
}

/// Tab-scoped string store, the stand-in for `sessionStorage`: holds the
/// per-key result cache and the staged fallback queries. Values are stored
/// serialized, as the browser store would hold them. Never invalidated except
/// by dropping the store (tab-session end).
#[derive(Clone, Default)]
pub struct TabStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl TabStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: String, value: String) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key, value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
    }

    /// Writes happen only after a successful fetch; readers see a fully
    /// populated entry or none.
    pub fn cache_results(&self, session_key: &str, results: &CachedResults) {
        if let Ok(serialized) = serde_json::to_string(results) {
            self.set(format!("{RESULT_PREFIX}{session_key}"), serialized);
        }
    }

    #[must_use]
    pub fn cached_results(&self, session_key: &str) -> Option<CachedResults> {
        let raw = self.get(&format!("{RESULT_PREFIX}{session_key}"))?;
        serde_json::from_str(&raw).ok()
    }

    /// Stages the original query text against a fresh session key; read back
    /// as `fallback_q` if the server-side session has expired by fetch time.
    pub fn stage_query(&self, session_key: &str, query: &str) {
        self.set(format!("{STAGING_PREFIX}{session_key}"), query.to_string());
    }

    #[must_use]
    pub fn staged_query(&self, session_key: &str) -> Option<String> {
        self.get(&format!("{STAGING_PREFIX}{session_key}"))
    }

    pub fn remove_staged(&self, session_key: &str) {
        self.remove(&format!("{STAGING_PREFIX}{session_key}"));
    }
}
