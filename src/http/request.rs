//! Request identification and query extraction.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) per request
//! - Propagate it to the response as `x-request-id`
//! - Extract the compose query parameters
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A client-supplied `x-request-id` is kept

use axum::http::{HeaderName, Request};
use serde::Deserialize;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use uuid::Uuid;

use crate::source::SourceRequest;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Layer that assigns a request ID when none is present.
pub fn set_request_id_layer() -> SetRequestIdLayer<UuidRequestId> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), UuidRequestId)
}

/// Layer that copies the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// Read the request ID set by [`set_request_id_layer`].
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Query parameters of `/config` and `/config/report`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeQuery {
    pub origin_url: Option<String>,
    pub addon_url: Option<String>,
    pub mode: Option<String>,
}

impl ComposeQuery {
    pub fn sources(&self) -> SourceRequest {
        SourceRequest {
            origin_url: self.origin_url.clone(),
            addon_url: self.addon_url.clone(),
        }
    }

    /// The requested mode token, or `default` when absent or blank.
    pub fn mode_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.mode
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_make_request_id_is_uuid() {
        let request = Request::builder().body(Body::empty()).unwrap();
        let id = UuidRequestId.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }

    #[test]
    fn test_request_id_fallback() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(request_id(&request), "unknown");
    }

    #[test]
    fn test_mode_fallback() {
        let query = ComposeQuery {
            mode: Some("  ".into()),
            ..ComposeQuery::default()
        };
        assert_eq!(query.mode_or("update"), "update");

        let query = ComposeQuery {
            mode: Some("Insert".into()),
            ..ComposeQuery::default()
        };
        assert_eq!(query.mode_or("update"), "Insert");
    }
}
