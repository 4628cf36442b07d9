//! # Webhook Inspector Axum Integration
//!
//! This crate provides the HTTP surface of Webhook Inspector on Axum, including:
//! - Route mounting under `/api` plus `/health`
//! - Cookie parsing middleware and extractors
//! - Error-to-response mapping
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use webhook_inspector_axum::{router, AppState, HttpSettings};
//! use webhook_inspector_core::{Inspector, InspectorConfig, MemoryStore};
//!
//! let inspector = Inspector::new(Arc::new(MemoryStore::new()), InspectorConfig::default());
//! let app = router(AppState::new(inspector, HttpSettings::default()));
//! ```

mod cookie;
mod extractor;
mod layer;
mod routes;

pub use cookie::{CookieOptions, SESSION_COOKIE, STATE_COOKIE, TOKEN_COOKIE, read_cookie};
pub use extractor::RequestCookies;
pub use layer::{CallerLayer, CallerMiddleware};
pub use routes::{AppState, DEFAULT_FRONTEND_URL, HttpSettings, api_routes, router};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use webhook_inspector_core::InspectorError;
use webhook_inspector_oauth::OAuthError;

/// Wrapper for InspectorError that implements IntoResponse.
#[derive(Debug)]
pub struct InspectorErrorResponse(pub InspectorError);

impl IntoResponse for InspectorErrorResponse {
    fn into_response(self) -> Response {
        let code = self.0.status_code();
        if self.0.is_user_error() {
            tracing::debug!(code, error = %self.0, "Request rejected");
        } else {
            tracing::error!(code, retryable = self.0.is_retryable(), error = %self.0, "Request failed");
        }

        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "error": self.0.to_string(),
            "code": code
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<InspectorError> for InspectorErrorResponse {
    fn from(err: InspectorError) -> Self {
        InspectorErrorResponse(err)
    }
}

impl From<OAuthError> for InspectorErrorResponse {
    fn from(err: OAuthError) -> Self {
        InspectorErrorResponse(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status() {
        let response = InspectorErrorResponse(InspectorError::Unauthenticated).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = InspectorErrorResponse::from(OAuthError::InvalidState).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response =
            InspectorErrorResponse(InspectorError::infrastructure("timed out")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
