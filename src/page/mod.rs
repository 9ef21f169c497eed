//! Client-side search page core: the derived filter/sort/paginate pipeline,
//! session-keyed result caching, search history, and the controller that
//! orchestrates them against a [`backend::SearchBackend`].

pub mod adapter;
pub mod autocomplete;
pub mod backend;
pub mod cache;
pub mod controller;
pub mod debounce;
pub mod history;
pub mod pipeline;

pub use autocomplete::AutocompleteSelect;
pub use backend::{BackendError, HttpSearchBackend, SearchBackend};
pub use cache::{CachedResults, TabStore};
pub use controller::{Navigation, SearchPage};
pub use debounce::Debouncer;
pub use history::HistoryStore;
pub use pipeline::Filters;
