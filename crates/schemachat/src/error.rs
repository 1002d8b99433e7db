//! HTTP-facing error taxonomy.
//!
//! Handlers return `Result<T, ApiError>`. Conversions only carry the detail;
//! upstream failures are logged once, in `into_response`, and the caller
//! only ever sees a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::conversation::EngineError;
use crate::presentation::TurnError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    /// Missing and not-owned projects both map here.
    #[error("project not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Unauthorized".to_owned(),
            ApiError::NotFound => "Project not found".to_owned(),
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Upstream(_) => "Failed to process request".to_owned(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Upstream(detail) = &self {
            error!(detail = %detail, "request failed upstream");
        }
        (self.status(), Json(json!({ "error": self.client_message() }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Upstream(format!("{:#}", e))
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::EmptyInput => ApiError::BadRequest(TurnError::EmptyInput.to_string()),
            TurnError::NotFound => ApiError::NotFound,
            TurnError::Engine(e) => e.into(),
            TurnError::Store(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(errors.to_string())
    }
}
