//! Payload validation and log redaction.

use crate::error::{InspectorError, InspectorResult};

const MAX_LOGGED_BODY: usize = 500;

const SENSITIVE_WORDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "key",
    "auth",
    "credential",
    "bearer",
    "api_key",
    "apikey",
    "access_token",
    "refresh_token",
    "client_secret",
    "private_key",
    "ssh_key",
    "certificate",
];

/// Checks that `body` is a JSON document and returns it as text.
pub fn validate_json(body: &[u8]) -> InspectorResult<&str> {
    let text = std::str::from_utf8(body)
        .map_err(|e| InspectorError::invalid_payload(e.to_string()))?;
    serde_json::from_str::<serde::de::IgnoredAny>(text)
        .map_err(|e| InspectorError::invalid_payload(e.to_string()))?;
    Ok(text)
}

/// Renders a rejected body for the logs.
///
/// Long bodies are truncated, and bodies mentioning anything credential-like
/// are replaced entirely.
pub fn redact_for_log(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let lower = text.to_lowercase();
    if SENSITIVE_WORDS.iter().any(|word| lower.contains(word)) {
        return "[REDACTED - contains sensitive data]".to_string();
    }

    if text.chars().count() > MAX_LOGGED_BODY {
        let head: String = text.chars().take(MAX_LOGGED_BODY).collect();
        format!("{head}...[truncated]")
    } else {
        text.into_owned()
    }
}
