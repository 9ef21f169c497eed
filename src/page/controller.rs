use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::adapter::{self, SortKey};
use super::backend::{BackendError, SearchBackend, SearchPayload};
use super::cache::{CachedResults, TabStore};
use super::history::HistoryStore;
use super::pipeline::{self, Filters};
use crate::clients::pddikti::Resource;

/// Scroll offset past which the "back to top" affordance is shown.
const SCROLL_THRESHOLD_PX: u32 = 500;

/// A fetch tagged with the navigation that triggered it. Results are applied
/// only while the tag is still current, so a fast double-navigation cannot
/// let a stale response overwrite fresher state.
#[derive(Debug)]
pub struct FetchTicket {
    key: String,
    seq: u64,
    fallback_q: Option<String>,
}

impl FetchTicket {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Outcome of the synchronous half of a navigation.
#[derive(Debug)]
pub enum Navigation {
    /// No key in the URL; nothing to show.
    Idle,
    /// Served from the tab-scoped result cache; no network needed.
    Hydrated,
    /// A fetch is required; run it and feed the result to `apply_fetch`.
    Fetch(FetchTicket),
}

/// Orchestrates one list page end to end: session key acquisition, result
/// fetch with session-scoped caching, the derived filter/sort/paginate
/// pipeline, search history, and the small UI affordances around them.
pub struct SearchPage {
    resource: Resource,
    backend: Arc<dyn SearchBackend>,
    history: HistoryStore,
    tab: TabStore,
    page_size: usize,

    current_key: Option<String>,
    query: String,
    all_results: Vec<Value>,
    loading: bool,
    error: Option<String>,

    filters: Filters,
    sort_by: Option<SortKey>,
    current_page: usize,

    search_query: String,
    focused: bool,
    show_back_to_top: bool,

    fetch_seq: u64,
}

impl SearchPage {
    #[must_use]
    pub fn new(
        resource: Resource,
        backend: Arc<dyn SearchBackend>,
        history: HistoryStore,
        tab: TabStore,
        page_size: usize,
    ) -> Self {
        Self {
            resource,
            backend,
            history,
            tab,
            page_size,
            current_key: None,
            query: String::new(),
            all_results: Vec::new(),
            loading: false,
            error: None,
            filters: Filters::default(),
            sort_by: None,
            current_page: 1,
            search_query: String::new(),
            focused: false,
            show_back_to_top: false,
            fetch_seq: 0,
        }
    }

    /// Registers a fresh search: updates history, acquires a session key,
    /// stages the query text for fallback recovery, and navigates to the new
    /// key. On registration failure nothing is navigated and a connection
    /// error is surfaced. Returns the new key on success.
    pub async fn handle_new_search(&mut self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.history.record(self.resource, text);

        match self.backend.initiate(text).await {
            Ok(initiated) => {
                // The staged copy is what recovers the search after the
                // server-side session expires.
                self.tab.stage_query(&initiated.key, &initiated.query);
                self.load(Some(initiated.key.clone())).await;
                Some(initiated.key)
            }
            Err(e) => {
                warn!(resource = %self.resource, "Search initiation failed: {e}");
                self.error = Some(display_error(&BackendError::Connection(e.to_string())));
                None
            }
        }
    }

    /// Synchronous half of the key-change effect: idle reset, cache fast
    /// path, or fetch preparation. Any navigation supersedes in-flight
    /// fetches, applied or not.
    pub fn navigate(&mut self, key: Option<String>) -> Navigation {
        self.fetch_seq += 1;

        let Some(key) = key else {
            self.current_key = None;
            self.query.clear();
            self.all_results.clear();
            self.loading = false;
            self.error = None;
            return Navigation::Idle;
        };

        self.current_key = Some(key.clone());

        if let Some(cached) = self.tab.cached_results(&key) {
            debug!(key = %key, "Hydrated results from tab cache");
            self.all_results = cached.data;
            self.query = cached.query;
            self.loading = false;
            self.error = None;
            return Navigation::Hydrated;
        }

        self.filters.reset();
        self.current_page = 1;
        self.loading = true;
        self.error = None;

        Navigation::Fetch(FetchTicket {
            fallback_q: self.tab.staged_query(&key),
            key,
            seq: self.fetch_seq,
        })
    }

    pub async fn fetch(&self, ticket: &FetchTicket) -> Result<SearchPayload, BackendError> {
        self.backend
            .search(self.resource, &ticket.key, ticket.fallback_q.as_deref())
            .await
    }

    /// Applies a completed fetch. A result whose ticket has been superseded
    /// by a later navigation is discarded.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, result: Result<SearchPayload, BackendError>) {
        if ticket.seq != self.fetch_seq {
            debug!(key = %ticket.key, "Discarding stale search response");
            return;
        }

        match result {
            Ok(payload) => {
                self.tab.cache_results(
                    &ticket.key,
                    &CachedResults {
                        query: payload.query.clone(),
                        data: payload.data.clone(),
                    },
                );
                if ticket.fallback_q.is_some() {
                    // One-shot recovery: a used fallback is not kept around.
                    self.tab.remove_staged(&ticket.key);
                }
                self.all_results = payload.data;
                self.query = payload.query;
                self.error = None;
            }
            Err(e) => {
                warn!(resource = %self.resource, key = %ticket.key, "Search fetch failed: {e}");
                self.error = Some(display_error(&e));
            }
        }

        self.loading = false;
    }

    /// Full key-change effect: navigate, then fetch and apply if needed.
    pub async fn load(&mut self, key: Option<String>) {
        if let Navigation::Fetch(ticket) = self.navigate(key) {
            let result = self.fetch(&ticket).await;
            self.apply_fetch(ticket, result);
        }
    }

    // ---- derived pipeline ----

    /// Filtered and sorted results; recomputed from the raw set on demand.
    #[must_use]
    pub fn processed_results(&self) -> Vec<Value> {
        pipeline::process(
            &self.all_results,
            &self.filters,
            adapter::fields(self.resource),
            self.sort_by.as_ref(),
        )
    }

    #[must_use]
    pub fn paginated_results(&self) -> Vec<Value> {
        pipeline::page_slice(&self.processed_results(), self.current_page, self.page_size).to_vec()
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        pipeline::total_pages(self.processed_results().len(), self.page_size)
    }

    /// Selectable filter values, always drawn from the current unfiltered
    /// result set.
    #[must_use]
    pub fn institution_options(&self) -> Vec<String> {
        pipeline::filter_options(&self.all_results, adapter::fields(self.resource).institution)
    }

    #[must_use]
    pub fn program_options(&self) -> Vec<String> {
        pipeline::filter_options(&self.all_results, adapter::fields(self.resource).program)
    }

    #[must_use]
    pub fn level_options(&self) -> Vec<String> {
        pipeline::filter_options(&self.all_results, adapter::fields(self.resource).level)
    }

    pub fn set_filter_pt(&mut self, value: &str) {
        self.filters.pt = value.to_string();
        self.current_page = 1;
    }

    pub fn set_filter_prodi(&mut self, value: &str) {
        self.filters.prodi = value.to_string();
        self.current_page = 1;
    }

    pub fn set_filter_jenjang(&mut self, value: &str) {
        self.filters.jenjang = value.to_string();
        self.current_page = 1;
    }

    /// Accepts sort keys like `"nama-asc"`; unknown keys clear the sort.
    pub fn set_sort_by(&mut self, sort_by: &str) {
        self.sort_by = adapter::parse_sort(self.resource, sort_by);
        self.current_page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        let max = self.total_pages().max(1);
        self.current_page = page.clamp(1, max);
    }

    // ---- ancillary UI state ----

    pub fn set_search_query(&mut self, text: &str) {
        self.search_query = text.to_string();
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    /// Click outside the search box closes the history dropdown.
    pub fn handle_outside_click(&mut self) {
        self.focused = false;
    }

    pub fn on_scroll(&mut self, offset_px: u32) {
        self.show_back_to_top = offset_px > SCROLL_THRESHOLD_PX;
    }

    // ---- accessors ----

    #[must_use]
    pub fn current_key(&self) -> Option<&str> {
        self.current_key.as_deref()
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn all_results(&self) -> &[Value] {
        &self.all_results
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    #[must_use]
    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    #[must_use]
    pub const fn is_focused(&self) -> bool {
        self.focused
    }

    #[must_use]
    pub const fn show_back_to_top(&self) -> bool {
        self.show_back_to_top
    }

    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.list(self.resource)
    }
}

fn display_error(error: &BackendError) -> String {
    match error {
        BackendError::SessionExpired => {
            "Your search link has expired. Please start a new search.".to_string()
        }
        BackendError::Connection(_) => {
            "Could not reach the search service. Please check your connection.".to_string()
        }
        BackendError::Service(message) => message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::backend::InitiatedSearch;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory stand-in for the proxy: initiate registers keys, search
    /// resolves them with the same fallback semantics the server has.
    struct FakeBackend {
        sessions: Mutex<HashMap<String, String>>,
        results: Vec<Value>,
        counter: AtomicUsize,
        search_calls: AtomicUsize,
        fail_initiate: bool,
    }

    impl FakeBackend {
        fn with_results(results: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                sessions: Mutex::new(HashMap::new()),
                results,
                counter: AtomicUsize::new(0),
                search_calls: AtomicUsize::new(0),
                fail_initiate: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                sessions: Mutex::new(HashMap::new()),
                results: Vec::new(),
                counter: AtomicUsize::new(0),
                search_calls: AtomicUsize::new(0),
                fail_initiate: true,
            })
        }

        fn expire_all(&self) {
            self.sessions.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl SearchBackend for FakeBackend {
        async fn initiate(&self, query: &str) -> Result<InitiatedSearch, BackendError> {
            if self.fail_initiate {
                return Err(BackendError::Connection("refused".to_string()));
            }
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            let key = format!("key{n:013}abc");
            self.sessions
                .lock()
                .unwrap()
                .insert(key.clone(), query.to_string());
            Ok(InitiatedSearch {
                key,
                query: query.to_string(),
            })
        }

        async fn search(
            &self,
            _resource: Resource,
            key: &str,
            fallback_q: Option<&str>,
        ) -> Result<SearchPayload, BackendError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            let resolved = self.sessions.lock().unwrap().get(key).cloned();
            let query = match (resolved, fallback_q) {
                (Some(q), _) => q,
                (None, Some(f)) => f.to_string(),
                (None, None) => return Err(BackendError::SessionExpired),
            };
            Ok(SearchPayload {
                data: self.results.clone(),
                query,
            })
        }

        async fn suggest(
            &self,
            _resource: Resource,
            _query: &str,
        ) -> Result<Vec<Value>, BackendError> {
            Ok(self.results.clone())
        }
    }

    fn students(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| {
                json!({
                    "nama": format!("Mahasiswa {:02}", i),
                    "nim": format!("{:08}", i),
                    "nama_pt": if i % 2 == 0 { "Universitas A" } else { "Institut B" },
                    "nama_prodi": "Informatika",
                    "jenjang": "S1",
                })
            })
            .collect()
    }

    fn page(backend: Arc<FakeBackend>) -> SearchPage {
        SearchPage::new(
            Resource::Mahasiswa,
            backend,
            HistoryStore::new(5),
            TabStore::new(),
            10,
        )
    }

    #[tokio::test]
    async fn test_new_search_fetches_and_caches() {
        let backend = FakeBackend::with_results(students(3));
        let mut page = page(Arc::clone(&backend));

        let key = page.handle_new_search("Universitas A").await.unwrap();

        assert!(!page.is_loading());
        assert!(page.error().is_none());
        assert_eq!(page.query(), "Universitas A");
        assert_eq!(page.all_results().len(), 3);
        assert_eq!(page.history(), vec!["Universitas A"]);
        assert!(page.tab.cached_results(&key).is_some());
    }

    #[tokio::test]
    async fn test_blank_search_is_noop() {
        let backend = FakeBackend::with_results(students(3));
        let mut page = page(Arc::clone(&backend));

        assert!(page.handle_new_search("   ").await.is_none());
        assert!(page.history().is_empty());
        assert_eq!(backend.search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_initiate_failure_surfaces_error_without_navigation() {
        let backend = FakeBackend::failing();
        let mut page = page(backend);

        assert!(page.handle_new_search("ugm").await.is_none());
        assert!(page.current_key().is_none());
        assert!(page.error().unwrap().contains("check your connection"));
    }

    #[tokio::test]
    async fn test_cache_fast_path_skips_network() {
        let backend = FakeBackend::with_results(students(4));
        let mut page = page(Arc::clone(&backend));

        let key = page.handle_new_search("itb").await.unwrap();
        let fetched = page.all_results().to_vec();
        assert_eq!(backend.search_calls.load(Ordering::SeqCst), 1);

        // Revisit the same key: hydrate from cache, identical state, no fetch
        page.load(None).await;
        assert!(page.all_results().is_empty());
        page.load(Some(key)).await;

        assert_eq!(backend.search_calls.load(Ordering::SeqCst), 1);
        assert_eq!(page.all_results(), fetched.as_slice());
        assert_eq!(page.query(), "itb");
    }

    #[tokio::test]
    async fn test_fallback_recovers_expired_session_once() {
        let backend = FakeBackend::with_results(students(2));
        let mut page = page(Arc::clone(&backend));

        // Stage as handle_new_search would, but expire the session before the
        // fetch ever happens (refresh after TTL).
        let initiated = backend.initiate("unpad").await.unwrap();
        page.tab.stage_query(&initiated.key, &initiated.query);
        backend.expire_all();

        page.load(Some(initiated.key.clone())).await;

        assert!(page.error().is_none());
        assert_eq!(page.query(), "unpad");
        // One-shot: the staging entry is consumed by the recovery
        assert!(page.tab.staged_query(&initiated.key).is_none());
    }

    #[tokio::test]
    async fn test_expired_session_without_fallback_prompts_new_search() {
        let backend = FakeBackend::with_results(students(2));
        let mut page = page(backend);

        page.load(Some("unknownkey123456".to_string())).await;

        assert!(!page.is_loading());
        assert!(page.error().unwrap().contains("expired"));
        assert!(page.all_results().is_empty());
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let backend = FakeBackend::with_results(students(1));
        let mut page = page(backend);

        let Navigation::Fetch(stale) = page.navigate(Some("first0000000key0".to_string())) else {
            panic!("expected fetch");
        };
        let Navigation::Fetch(current) = page.navigate(Some("second000000key0".to_string())) else {
            panic!("expected fetch");
        };

        // The older response arrives after the newer navigation
        page.apply_fetch(
            stale,
            Ok(SearchPayload {
                data: students(5),
                query: "stale".to_string(),
            }),
        );
        assert!(page.is_loading());
        assert!(page.all_results().is_empty());

        page.apply_fetch(
            current,
            Ok(SearchPayload {
                data: students(2),
                query: "fresh".to_string(),
            }),
        );
        assert!(!page.is_loading());
        assert_eq!(page.query(), "fresh");
        assert_eq!(page.all_results().len(), 2);
    }

    #[tokio::test]
    async fn test_navigating_away_clears_to_idle() {
        let backend = FakeBackend::with_results(students(3));
        let mut page = page(backend);

        page.handle_new_search("ui").await.unwrap();
        page.load(None).await;

        assert!(page.current_key().is_none());
        assert!(page.all_results().is_empty());
        assert_eq!(page.query(), "");
        assert!(!page.is_loading());
    }

    #[tokio::test]
    async fn test_derived_pipeline_scenario() {
        // 25 results, no filter, nama-asc: 3 pages of 10/10/5, sorted
        let backend = FakeBackend::with_results(students(25));
        let mut page = page(backend);

        page.handle_new_search("informatika").await.unwrap();
        page.set_sort_by("nama-asc");

        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.paginated_results().len(), 10);
        page.set_page(3);
        assert_eq!(page.paginated_results().len(), 5);

        page.set_page(1);
        let names: Vec<String> = page
            .paginated_results()
            .iter()
            .map(|v| v["nama"].as_str().unwrap().to_string())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn test_filter_change_resets_page_and_narrows_results() {
        let backend = FakeBackend::with_results(students(25));
        let mut page = page(backend);

        page.handle_new_search("informatika").await.unwrap();
        page.set_page(3);
        page.set_filter_pt("Universitas A");

        assert_eq!(page.current_page(), 1);
        assert_eq!(page.processed_results().len(), 13);
        assert_eq!(
            page.institution_options(),
            vec!["Institut B", "Universitas A"]
        );
    }

    #[tokio::test]
    async fn test_new_fetch_resets_filters() {
        let backend = FakeBackend::with_results(students(10));
        let mut page = page(backend);

        page.handle_new_search("first").await.unwrap();
        page.set_filter_pt("Universitas A");
        page.handle_new_search("second").await.unwrap();

        assert!(page.filters().is_default());
        assert_eq!(page.current_page(), 1);
    }

    #[tokio::test]
    async fn test_history_orders_and_caps() {
        let backend = FakeBackend::with_results(students(1));
        let mut page = page(backend);

        for q in ["a", "b", "c", "d", "e", "f", "b"] {
            page.handle_new_search(q).await.unwrap();
        }

        assert_eq!(page.history(), vec!["b", "f", "e", "d", "c"]);
    }

    #[tokio::test]
    async fn test_back_to_top_threshold() {
        let backend = FakeBackend::with_results(Vec::new());
        let mut page = page(backend);

        page.on_scroll(499);
        assert!(!page.show_back_to_top());
        page.on_scroll(501);
        assert!(page.show_back_to_top());
        page.on_scroll(0);
        assert!(!page.show_back_to_top());
    }

    #[tokio::test]
    async fn test_outside_click_closes_history_dropdown() {
        let backend = FakeBackend::with_results(Vec::new());
        let mut page = page(backend);

        page.set_focused(true);
        assert!(page.is_focused());
        page.handle_outside_click();
        assert!(!page.is_focused());
    }
}
