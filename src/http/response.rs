//! Response building and error mapping.
//!
//! # Responsibilities
//! - Encode composed profiles as YAML responses
//! - Map fatal errors to status codes with a JSON `{"err": ...}` body
//!
//! # Design Decisions
//! - Fatal errors never carry a partial profile
//! - Snippet failures ride along as a header count; details live in
//!   `/config/report`

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::compose::{ComposeError, ComposeReport};
use crate::source::SourceError;

/// Header carrying the number of unresolved snippet groups.
pub const X_COMPOSE_FAILURES: &str = "x-compose-failures";

/// Media type of composed profiles.
pub const YAML_CONTENT_TYPE: &str = "text/yaml; charset=utf-8";

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("compose task failed: {0}")]
    Task(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Source(SourceError::Fetch { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Source(SourceError::Parse { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Compose(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "err": self.to_string() }))).into_response()
    }
}

/// A composed profile as a YAML response.
pub fn yaml_response(body: Vec<u8>, report: &ComposeReport) -> Response {
    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static(YAML_CONTENT_TYPE))],
        body,
    )
        .into_response();
    if !report.is_clean() {
        response
            .headers_mut()
            .insert(X_COMPOSE_FAILURES, HeaderValue::from(report.failures.len()));
    }
    response
}
