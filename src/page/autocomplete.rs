use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use super::backend::{BackendError, SearchBackend};
use crate::clients::pddikti::Resource;

/// Debounced entity picker: text input is quieted for a debounce period, a
/// superseded in-flight fetch is aborted, identical consecutive queries are
/// not re-sent, and the candidate list supports wrap-around highlight
/// navigation ending in a selected entity or none.
pub struct AutocompleteSelect {
    backend: Arc<dyn SearchBackend>,
    resource: Resource,
    debounce: Duration,
    limit: usize,

    last_query: Option<String>,
    in_flight: Option<JoinHandle<Result<Vec<Value>, BackendError>>>,

    candidates: Vec<Value>,
    highlighted: Option<usize>,
    selected: Option<Value>,
    error: Option<String>,
}

impl AutocompleteSelect {
    #[must_use]
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        resource: Resource,
        debounce: Duration,
        limit: usize,
    ) -> Self {
        Self {
            backend,
            resource,
            debounce,
            limit,
            last_query: None,
            in_flight: None,
            candidates: Vec::new(),
            highlighted: None,
            selected: None,
            error: None,
        }
    }

    /// Reacts to a change of the text input. The fetch is debounced and the
    /// previous one aborted, so fast typing produces at most one request.
    pub fn input(&mut self, text: &str) {
        let text = text.trim();

        if text.is_empty() {
            self.abort_in_flight();
            self.last_query = None;
            self.candidates.clear();
            self.highlighted = None;
            return;
        }

        if self.last_query.as_deref() == Some(text) {
            return;
        }

        self.abort_in_flight();
        self.last_query = Some(text.to_string());

        let backend = Arc::clone(&self.backend);
        let resource = self.resource;
        let debounce = self.debounce;
        let query = text.to_string();

        self.in_flight = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            backend.suggest(resource, &query).await
        }));
    }

    /// Awaits the current fetch, if any, and applies its outcome. An aborted
    /// fetch applies nothing.
    pub async fn settle(&mut self) {
        let Some(handle) = self.in_flight.take() else {
            return;
        };

        match handle.await {
            Ok(Ok(mut items)) => {
                items.truncate(self.limit);
                self.candidates = items;
                self.highlighted = None;
                self.error = None;
            }
            Ok(Err(e)) => {
                debug!(resource = %self.resource, "Autocomplete fetch failed: {e}");
                self.candidates.clear();
                self.highlighted = None;
                self.error = Some(e.to_string());
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                self.error = Some(format!("Autocomplete task failed: {e}"));
            }
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    pub fn highlight_next(&mut self) {
        if self.candidates.is_empty() {
            return;
        }
        self.highlighted = Some(match self.highlighted {
            Some(i) if i + 1 < self.candidates.len() => i + 1,
            Some(_) => 0,
            None => 0,
        });
    }

    pub fn highlight_prev(&mut self) {
        if self.candidates.is_empty() {
            return;
        }
        self.highlighted = Some(match self.highlighted {
            Some(0) | None => self.candidates.len() - 1,
            Some(i) => i - 1,
        });
    }

    /// Confirms the highlighted candidate, closing the list.
    pub fn select_highlighted(&mut self) -> Option<&Value> {
        let index = self.highlighted?;
        let candidate = self.candidates.get(index)?.clone();
        self.selected = Some(candidate);
        self.candidates.clear();
        self.highlighted = None;
        self.selected.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Value> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn candidates(&self) -> &[Value] {
        &self.candidates
    }

    #[must_use]
    pub const fn highlighted_index(&self) -> Option<usize> {
        self.highlighted
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
