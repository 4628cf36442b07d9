//! Cookie names, parsing and `Set-Cookie` rendering.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// Cookie carrying the caller's webhook token.
pub const TOKEN_COOKIE: &str = "webhook_token";
/// Cookie carrying the caller's session handle.
pub const SESSION_COOKIE: &str = "session_token";
/// Cookie carrying the CSRF state of a login in progress.
pub const STATE_COOKIE: &str = "oauth_state";

/// Cookie options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<String>,
    /// Negative values expire the cookie immediately.
    pub max_age: Option<i64>,
    pub path: Option<String>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            secure: false,
            same_site: Some("Lax".to_string()),
            max_age: None,
            path: Some("/".to_string()),
        }
    }
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Secure flag.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets Max-Age from a duration.
    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(i64::try_from(age.as_secs()).unwrap_or(i64::MAX));
        self
    }

    /// Options that make the browser drop the cookie.
    pub fn expired(mut self) -> Self {
        self.max_age = Some(-1);
        self
    }

    /// Renders a `Set-Cookie` header value.
    pub fn render(&self, name: &str, value: &str) -> String {
        let mut cookie = format!("{}={}", name, value);
        if let Some(path) = &self.path {
            cookie.push_str(&format!("; Path={}", path));
        }
        if let Some(age) = self.max_age {
            if age < 0 {
                cookie.push_str("; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
            } else {
                cookie.push_str(&format!("; Max-Age={}", age));
            }
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        if let Some(same_site) = &self.same_site {
            cookie.push_str(&format!("; SameSite={}", same_site));
        }
        cookie
    }

    /// Renders a `Set-Cookie` header pair.
    ///
    /// Names and values are ours (fixed names, UUID values), so rendering
    /// never produces an invalid header; anything else is dropped.
    pub fn header(&self, name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
        match HeaderValue::from_str(&self.render(name, value)) {
            Ok(value) => Some((SET_COOKIE, value)),
            Err(err) => {
                tracing::warn!(cookie = name, error = %err, "Dropping unrenderable cookie");
                None
            }
        }
    }
}

/// Reads a cookie from the request headers.
///
/// Empty values count as absent.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_defaults() {
        let options = CookieOptions::new().max_age(Duration::from_secs(259_200));
        assert_eq!(
            options.render(TOKEN_COOKIE, "abc"),
            "webhook_token=abc; Path=/; Max-Age=259200; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_render_secure_and_expired() {
        let rendered = CookieOptions::new().secure(true).expired().render(SESSION_COOKIE, "");
        assert!(rendered.starts_with("session_token=; Path=/; Max-Age=0;"));
        assert!(rendered.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert!(rendered.contains("; Secure"));
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=value; webhook_token=abc; session_token="),
        );
        headers.append(COOKIE, HeaderValue::from_static("oauth_state=\"s1\""));

        assert_eq!(read_cookie(&headers, TOKEN_COOKIE).as_deref(), Some("abc"));
        assert_eq!(read_cookie(&headers, SESSION_COOKIE), None);
        assert_eq!(read_cookie(&headers, STATE_COOKIE).as_deref(), Some("s1"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }
}
