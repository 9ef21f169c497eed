use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitiateResponse {
    pub key: String,
    pub query: String,
}

/// Search result envelope: the raw entity records plus the query the server
/// actually resolved (which may differ from what the client sent when a
/// fallback was used).
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub data: Vec<Value>,
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub active_sessions: usize,
}
