//! Webhook token resolution and generation.

use crate::error::{InspectorError, InspectorResult};
use uuid::Uuid;

/// Derives the effective token of a request.
///
/// The cookie token is mandatory. A token taken from the URL must match it,
/// so a caller can only ever act on the token it holds.
pub fn resolve_token(cookie: Option<&str>, path: Option<&str>) -> InspectorResult<String> {
    let cookie = cookie
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(InspectorError::Unauthenticated)?;

    match path {
        Some(path) if path != cookie => {
            tracing::debug!(cookie, path, "Token in URL does not match cookie");
            Err(InspectorError::TokenMismatch)
        }
        _ => Ok(cookie.to_string()),
    }
}

/// Generates a fresh opaque token.
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_only() {
        assert_eq!(resolve_token(Some("abc"), None).unwrap(), "abc");
    }

    #[test]
    fn test_matching_path() {
        assert_eq!(resolve_token(Some("abc"), Some("abc")).unwrap(), "abc");
    }

    #[test]
    fn test_missing_cookie() {
        assert!(matches!(
            resolve_token(None, Some("abc")),
            Err(InspectorError::Unauthenticated)
        ));
        assert!(matches!(
            resolve_token(Some(""), None),
            Err(InspectorError::Unauthenticated)
        ));
    }

    #[test]
    fn test_mismatch() {
        assert!(matches!(
            resolve_token(Some("abc"), Some("xyz")),
            Err(InspectorError::TokenMismatch)
        ));
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
