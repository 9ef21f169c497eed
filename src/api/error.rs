use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ErrorBody;
use crate::clients::pddikti::PddiktiError;

#[derive(Debug)]
pub enum ApiError {
    ValidationError(String),

    /// The session key could not be resolved and no fallback query was
    /// supplied. Kept distinct from plain NotFound so clients can prompt a
    /// fresh search instead of showing "no results".
    SessionExpired,

    NotFound(String),

    UpstreamError { status: u16, message: String },

    ParseError(String),

    ConnectionError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::SessionExpired => write!(f, "Search session expired or invalid"),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::UpstreamError { status, message } => {
                write!(f, "PDDikti error {}: {}", status, message)
            }
            ApiError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ApiError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::SessionExpired => (
                StatusCode::NOT_FOUND,
                "Search session expired or invalid. Please start a new search.".to_string(),
                None,
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::UpstreamError {
                status: upstream_status,
                message,
            } => {
                tracing::warn!("PDDikti API error {}: {}", upstream_status, message);
                let status = StatusCode::from_u16(upstream_status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (
                    status,
                    format!("PDDikti responded with status {}", upstream_status),
                    Some(message),
                )
            }
            ApiError::ParseError(msg) => {
                tracing::error!("PDDikti returned an unparseable body: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "PDDikti returned an unreadable response".to_string(),
                    Some(msg),
                )
            }
            ApiError::ConnectionError(msg) => {
                tracing::warn!("Upstream connection failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Could not reach PDDikti. Please check your connection and try again."
                        .to_string(),
                    Some(msg),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody { message, details };
        (status, Json(body)).into_response()
    }
}

impl From<PddiktiError> for ApiError {
    fn from(err: PddiktiError) -> Self {
        match err {
            PddiktiError::Upstream { status, message } => {
                ApiError::UpstreamError { status, message }
            }
            PddiktiError::Parse(msg) => ApiError::ParseError(msg),
            PddiktiError::Connection(e) => ApiError::ConnectionError(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}
