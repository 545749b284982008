//! HTTP surface for the recipe engine.
//!
//! Outcomes become status codes here; validation errors are reported with
//! their message, store errors only as `internal error`.

pub mod app;
pub mod handlers;
pub mod state;

use crate::recipe::{EngineError, IntentError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

pub use app::build_router;
pub use state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// `{"data": ...}` success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub message: String,
}

#[derive(Debug)]
pub enum WebError {
    Intent(IntentError),
    NotFound(String),
    Internal,
    Unavailable,
}

impl From<EngineError> for WebError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Intent(intent) => Self::Intent(intent),
            // Already logged by the engine with full detail.
            EngineError::Store(_) => Self::Internal,
            EngineError::Corrupt(msg) => {
                warn!(detail = %msg, "store returned an unexpected row shape");
                Self::Internal
            }
        }
    }
}

impl From<IntentError> for WebError {
    fn from(err: IntentError) -> Self {
        Self::Intent(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            WebError::Intent(err @ IntentError::InvalidIntent(_)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                err.to_string(),
                "invalid_intent",
            ),
            WebError::Intent(err @ IntentError::InvalidField(_)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                err.to_string(),
                "invalid_field",
            ),
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "not_found"),
            WebError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
                "internal_error",
            ),
            WebError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "store unavailable".to_string(),
                "unavailable",
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;
