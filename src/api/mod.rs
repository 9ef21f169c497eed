use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::clients::pddikti::PddiktiClient;
use crate::config::Config;
use crate::session::SessionStore;

mod error;
mod observability;
mod search;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

pub struct AppState {
    pub config: Config,

    pub sessions: SessionStore,

    pub pddikti: PddiktiClient,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    #[must_use]
    pub fn pddikti(&self) -> &PddiktiClient {
        &self.pddikti
    }

    #[cfg(test)]
    pub(crate) fn for_tests(config: Config) -> Self {
        Self {
            sessions: SessionStore::new(config.session_ttl()),
            pddikti: PddiktiClient::with_shared_client(
                reqwest::Client::new(),
                &config.upstream.base_url,
            ),
            config,
            start_time: std::time::Instant::now(),
            prometheus_handle: None,
        }
    }
}

pub fn create_app_state(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let sessions = SessionStore::new(config.session_ttl());
    sessions.spawn_sweeper(std::time::Duration::from_secs(
        config.search.session_sweep_seconds,
    ));

    let pddikti = PddiktiClient::new(
        &config.upstream.base_url,
        config.upstream.request_timeout_seconds.into(),
    )?;

    Ok(Arc::new(AppState {
        config,
        sessions,
        pddikti,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .route("/search/initiate", post(search::initiate))
        .route("/health", get(system::get_health))
        .route("/metrics", get(observability::get_metrics))
        .route("/{resource}", get(search::search_resource))
        .route("/{resource}/spesifik", get(search::search_specific))
        .route("/{resource}/detail", get(search::resource_detail))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}
