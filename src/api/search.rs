use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ApiError, AppState, InitiateRequest, InitiateResponse, SearchResponse};
use crate::api::validation::{validate_detail_id, validate_search_query};
use crate::clients::pddikti::Resource;
use crate::page::adapter;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub key: Option<String>,
    pub fallback_q: Option<String>,
    /// Exact-match institution post-filter; compensates for upstream search
    /// imprecision on program-by-institution lookups.
    pub filter_pt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailParams {
    pub id: Option<String>,
}

/// POST /api/search/initiate: registers a free-text query and hands back the
/// opaque key the client navigates with.
pub async fn initiate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitiateRequest>,
) -> Result<Json<InitiateResponse>, ApiError> {
    let query = validate_search_query(request.query.as_deref().unwrap_or_default())?;

    let entry = state
        .sessions()
        .create(query)
        .map_err(|e| ApiError::internal(format!("Failed to register search session: {e}")))?;

    info!(key = %entry.key, "Search session initiated");

    Ok(Json(InitiateResponse {
        key: entry.key,
        query: entry.query,
    }))
}

/// GET /api/{resource}: resolves the query (session key, fallback, or raw
/// text, in that order) and forwards it upstream.
pub async fn search_resource(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let resource = parse_resource(&resource)?;
    let query = resolve_query(&state, &params)?;

    let mut data = state.pddikti().search(resource, &query).await?;

    if let Some(filter_pt) = params.filter_pt.as_deref() {
        let field = adapter::institution_field(resource);
        data.retain(|item| {
            item.get(field)
                .and_then(Value::as_str)
                .is_some_and(|v| v.eq_ignore_ascii_case(filter_pt))
        });
    }

    debug!(resource = %resource, results = data.len(), "Search forwarded");

    Ok(Json(SearchResponse { data, query }))
}

/// GET /api/{resource}/spesifik: searches upstream and returns the first
/// record whose supplied fields all match exactly (case-insensitive).
pub async fn search_specific(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let resource = parse_resource(&resource)?;
    let query = params
        .get("q")
        .map(String::as_str)
        .ok_or_else(|| ApiError::validation("Missing required parameter: q"))?;
    let query = validate_search_query(query)?;

    let data = state.pddikti().search(resource, query).await?;

    let matches = |item: &Value| {
        params
            .iter()
            .filter(|(name, _)| name.as_str() != "q")
            .all(|(name, expected)| {
                item.get(name)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v.eq_ignore_ascii_case(expected))
            })
    };

    data.into_iter()
        .find(matches)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No exact {resource} match for '{query}'")))
}

/// GET /api/{resource}/detail: thin forward to the upstream detail endpoint.
pub async fn resource_detail(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
    Query(params): Query<DetailParams>,
) -> Result<Json<Value>, ApiError> {
    let resource = parse_resource(&resource)?;
    let id = validate_detail_id(params.id.as_deref().unwrap_or_default())?;

    let detail = state.pddikti().detail(resource, id).await?;

    detail
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("{resource} {id} not found")))
}

fn parse_resource(name: &str) -> Result<Resource, ApiError> {
    Resource::parse(name).ok_or_else(|| ApiError::not_found(format!("Unknown resource: {name}")))
}

/// Ordered query resolution: session key first, then the client-supplied
/// fallback (recovers from expiry after a refresh), then raw `q`.
fn resolve_query(state: &AppState, params: &SearchParams) -> Result<String, ApiError> {
    if let Some(key) = params.key.as_deref() {
        if let Some(query) = state.sessions().resolve(key) {
            return Ok(query);
        }

        if let Some(fallback) = params.fallback_q.as_deref() {
            let fallback = fallback.trim();
            if !fallback.is_empty() {
                info!(key = %key, "Session unresolvable, recovered via fallback query");
                return Ok(fallback.to_string());
            }
        }

        return Err(ApiError::SessionExpired);
    }

    if let Some(q) = params.q.as_deref() {
        let q = q.trim();
        if !q.is_empty() {
            return Ok(q.to_string());
        }
    }

    Err(ApiError::validation(
        "Missing required parameter: q or key",
    ))
}
