//! Credential extractors for Axum handlers.

use crate::cookie::{SESSION_COOKIE, STATE_COOKIE, TOKEN_COOKIE, read_cookie};
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use webhook_inspector_core::Caller;

/// Credentials carried by the request cookies.
///
/// Inserted into the request extensions by [`CallerLayer`](crate::CallerLayer);
/// parsed from the headers directly when the layer is not installed.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(cookies: RequestCookies) -> String {
///     match cookies.caller.token() {
///         Some(token) => format!("Hello, {}!", token),
///         None => "Hello, stranger!".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCookies {
    /// Webhook token and session handle.
    pub caller: Caller,
    /// CSRF state of a login in progress.
    pub oauth_state: Option<String>,
    /// True when a TLS-terminating proxy reports an https request.
    pub forwarded_https: bool,
}

impl RequestCookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let forwarded_https = headers
            .get("x-forwarded-proto")
            .and_then(|h| h.to_str().ok())
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));

        Self {
            caller: Caller::new(
                read_cookie(headers, TOKEN_COOKIE),
                read_cookie(headers, SESSION_COOKIE),
            ),
            oauth_state: read_cookie(headers, STATE_COOKIE),
            forwarded_https,
        }
    }
}

impl<S> FromRequestParts<S> for RequestCookies
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestCookies>()
            .cloned()
            .unwrap_or_else(|| RequestCookies::from_headers(&parts.headers)))
    }
}
