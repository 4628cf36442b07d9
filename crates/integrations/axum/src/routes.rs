//! HTTP routes for Webhook Inspector.

use crate::InspectorErrorResponse;
use crate::cookie::{CookieOptions, SESSION_COOKIE, STATE_COOKIE, TOKEN_COOKIE};
use crate::extractor::RequestCookies;
use crate::layer::CallerLayer;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse, Json, Redirect, Response};
use axum::routing::{delete, get, post};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use webhook_inspector_core::{
    Admission, HeaderValues, IncomingWebhook, Inspector, InspectorError, IssuedToken, Tier,
};
use webhook_inspector_oauth::{IdentityProvider, STATE_TTL, new_state, verify_state};

/// Where the browser lands after login and logout when nothing is configured.
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173/dashboard";

const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const LIMIT_HEADER: &str = "x-ratelimit-limit";

/// Settings of the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Dashboard URL the login and logout flows redirect to.
    pub frontend_url: String,
    /// Whether cookies carry the Secure flag.
    pub secure_cookies: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_URL)
    }
}

impl HttpSettings {
    /// Settings for a frontend URL; cookies are Secure when it is https.
    pub fn new(frontend_url: impl Into<String>) -> Self {
        let frontend_url = frontend_url.into();
        Self {
            secure_cookies: frontend_url.starts_with("https://"),
            frontend_url,
        }
    }

    fn redirect_to(&self, flag: &str) -> String {
        let separator = if self.frontend_url.contains('?') { '&' } else { '?' };
        format!("{}{}{}=1", self.frontend_url, separator, flag)
    }
}

/// Shared state for the routes.
#[derive(Clone)]
pub struct AppState {
    pub inspector: Inspector,
    /// `None` disables the login flow.
    pub provider: Option<Arc<dyn IdentityProvider>>,
    pub settings: Arc<HttpSettings>,
}

impl AppState {
    pub fn new(inspector: Inspector, settings: HttpSettings) -> Self {
        Self {
            inspector,
            provider: None,
            settings: Arc::new(settings),
        }
    }

    /// Enables login through `provider`.
    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    fn cookie_options(&self, cookies: &RequestCookies) -> CookieOptions {
        CookieOptions::new()
            .secure(self.settings.secure_cookies || cookies.forwarded_https)
            .max_age(self.inspector.config().session_ttl)
    }

    fn provider(&self) -> Result<&Arc<dyn IdentityProvider>, InspectorError> {
        self.provider
            .as_ref()
            .ok_or_else(|| InspectorError::config("GitHub login is not configured"))
    }
}

/// Creates the router with every route mounted.
///
/// # Example
///
/// ```rust,ignore
/// let app = router(AppState::new(inspector, HttpSettings::default()));
/// axum::serve(listener, app).await?;
/// ```
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(health_handler))
        .layer(CallerLayer::new())
        .with_state(state)
}

/// Routes served under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Webhooks
        .route("/hooks", post(ingest_handler))
        .route("/hooks/", post(ingest_handler))
        .route("/hooks/{token}", post(ingest_for_handler))
        // Token management
        .route("/logs", get(list_handler))
        .route("/logs/{id}", delete(delete_handler))
        .route("/status", get(status_handler))
        .route("/reset", post(reset_handler))
        .route("/create", get(create_handler))
        // Identity
        .route("/auth/github", get(login_handler))
        .route("/auth/github/callback", get(callback_handler))
        .route("/me", get(me_handler))
        .route("/logout", get(logout_handler))
}

type HandlerResult = Result<Response, InspectorErrorResponse>;

fn header_values(headers: &HeaderMap) -> HeaderValues {
    let mut values = HeaderValues::new();
    for (name, value) in headers {
        values
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    values
}

fn rate_limit_headers(remaining: u64, limit: u64) -> AppendHeaders<[(HeaderName, HeaderValue); 2]> {
    AppendHeaders([
        (HeaderName::from_static(REMAINING_HEADER), HeaderValue::from(remaining)),
        (HeaderName::from_static(LIMIT_HEADER), HeaderValue::from(limit)),
    ])
}

async fn ingest_handler(
    State(state): State<AppState>,
    cookies: RequestCookies,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    receive(&state, &cookies, None, method, &headers, body).await
}

async fn ingest_for_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
    cookies: RequestCookies,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    receive(&state, &cookies, Some(&token), method, &headers, body).await
}

async fn receive(
    state: &AppState,
    cookies: &RequestCookies,
    path_token: Option<&str>,
    method: Method,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let webhook = IncomingWebhook::new(method.as_str(), header_values(headers), body.to_vec());

    match state.inspector.ingest(&cookies.caller, path_token, webhook).await {
        Ok(ingested) => {
            let Admission {
                remaining, limit, ..
            } = ingested.admission;
            (rate_limit_headers(remaining, limit), "Webhook received").into_response()
        }
        Err(err @ InspectorError::RateLimited { limit, .. }) => {
            (rate_limit_headers(0, limit), InspectorErrorResponse(err)).into_response()
        }
        Err(err) => InspectorErrorResponse(err).into_response(),
    }
}

async fn list_handler(State(state): State<AppState>, cookies: RequestCookies) -> HandlerResult {
    let events = state.inspector.list(&cookies.caller).await?;
    Ok(Json(events).into_response())
}

async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    cookies: RequestCookies,
) -> HandlerResult {
    state.inspector.delete(&cookies.caller, &id).await?;
    Ok("Deleted".into_response())
}

async fn status_handler(State(state): State<AppState>, cookies: RequestCookies) -> HandlerResult {
    let status = state.inspector.status(&cookies.caller).await?;
    Ok(Json(status).into_response())
}

#[derive(Debug, Serialize)]
struct ResetResponse {
    new_token: String,
}

async fn reset_handler(State(state): State<AppState>, cookies: RequestCookies) -> HandlerResult {
    let issued = state.inspector.reset(&cookies.caller).await?;
    let set_cookie = state
        .cookie_options(&cookies)
        .header(TOKEN_COOKIE, &issued.token);

    Ok((
        AppendHeaders(set_cookie),
        Json(ResetResponse {
            new_token: issued.token,
        }),
    )
        .into_response())
}

async fn create_handler(State(state): State<AppState>, cookies: RequestCookies) -> HandlerResult {
    let IssuedToken { token, tier } = state.inspector.create(&cookies.caller).await?;
    let set_cookie = state.cookie_options(&cookies).header(TOKEN_COOKIE, &token);
    let message = match tier {
        Tier::Privileged => format!("Assigned privileged token: {}", token),
        Tier::Anonymous => format!("Assigned new anonymous token: {}", token),
    };

    Ok((AppendHeaders(set_cookie), message).into_response())
}

async fn login_handler(State(state): State<AppState>, cookies: RequestCookies) -> HandlerResult {
    let provider = state.provider()?;
    let oauth_state = new_state();
    let url = provider
        .authorization_url(&oauth_state)
        .map_err(InspectorError::from)?;

    let set_cookie = state
        .cookie_options(&cookies)
        .max_age(STATE_TTL)
        .header(STATE_COOKIE, &oauth_state);

    tracing::debug!(provider = provider.name(), "Redirecting to identity provider");
    Ok((AppendHeaders(set_cookie), Redirect::temporary(&url)).into_response())
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn callback_handler(
    State(state): State<AppState>,
    cookies: RequestCookies,
    Query(params): Query<CallbackParams>,
) -> HandlerResult {
    let provider = state.provider()?;

    if let Some(error) = params.error {
        return Err(InspectorError::identity_provider(format!("authorization denied: {}", error)).into());
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| InspectorError::missing_field("code"))?;
    verify_state(cookies.oauth_state.as_deref(), params.state.as_deref())
        .map_err(InspectorError::from)?;

    let credential = provider.exchange(&code).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to exchange code for token");
        InspectorError::from(e)
    })?;
    let identity = provider.fetch_identity(&credential).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to get user info");
        InspectorError::from(e)
    })?;

    let login = state.inspector.login(&identity.handle).await?;
    tracing::info!(
        identity = %identity.handle,
        external_id = %identity.external_id,
        "User logged in"
    );

    let options = state.cookie_options(&cookies);
    let set_cookies: Vec<(HeaderName, HeaderValue)> = [
        options.header(TOKEN_COOKIE, &login.token),
        options.header(SESSION_COOKIE, &login.session),
        options.clone().expired().header(STATE_COOKIE, ""),
    ]
    .into_iter()
    .flatten()
    .collect();

    Ok(found(&state.settings.redirect_to("login"), set_cookies))
}

#[derive(Debug, Serialize)]
struct MeResponse {
    logged_in: bool,
    username: String,
}

async fn me_handler(State(state): State<AppState>, cookies: RequestCookies) -> HandlerResult {
    let username = state.inspector.me(&cookies.caller).await?;
    Ok(Json(MeResponse {
        logged_in: true,
        username,
    })
    .into_response())
}

async fn logout_handler(State(state): State<AppState>, cookies: RequestCookies) -> HandlerResult {
    let issued = state.inspector.logout(&cookies.caller).await?;

    let options = state.cookie_options(&cookies);
    let set_cookies: Vec<(HeaderName, HeaderValue)> = [
        options.clone().expired().header(SESSION_COOKIE, ""),
        options.header(TOKEN_COOKIE, &issued.token),
    ]
    .into_iter()
    .flatten()
    .collect();

    Ok(found(&state.settings.redirect_to("logout"), set_cookies))
}

async fn health_handler(State(state): State<AppState>) -> Response {
    match state.inspector.ping().await {
        Ok(()) => "OK".into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable").into_response()
        }
    }
}

/// 302 redirect carrying cookies.
fn found(location: &str, set_cookies: Vec<(HeaderName, HeaderValue)>) -> Response {
    let mut response = (StatusCode::FOUND, AppendHeaders(set_cookies)).into_response();
    match HeaderValue::from_str(location) {
        Ok(location) => {
            response.headers_mut().insert(header::LOCATION, location);
        }
        Err(err) => {
            tracing::error!(location, error = %err, "Invalid redirect location");
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_frontend_url() {
        assert!(!HttpSettings::default().secure_cookies);
        assert!(HttpSettings::new("https://hooks.example.com/dashboard").secure_cookies);
    }

    #[test]
    fn test_redirect_to() {
        assert_eq!(
            HttpSettings::default().redirect_to("login"),
            "http://localhost:5173/dashboard?login=1"
        );
        assert_eq!(
            HttpSettings::new("https://example.com/?tab=logs").redirect_to("logout"),
            "https://example.com/?tab=logs&logout=1"
        );
    }

    #[test]
    fn test_header_values_keep_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let values = header_values(&headers);
        assert_eq!(values["x-tag"], vec!["a", "b"]);
        assert_eq!(values["content-type"], vec!["application/json"]);
    }
}
