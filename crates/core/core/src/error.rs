//! Error types for Webhook Inspector.
//!
//! This module defines the `InspectorError` enum which represents every
//! failure the token, rate limiting, event and session components can report.

use thiserror::Error;

/// The main error type for Webhook Inspector operations.
///
/// Absence of a record is never an error here: deleting an unknown event or
/// reading the status of an unused token are neutral successes.
#[derive(Debug, Error)]
pub enum InspectorError {
    // ==================== Resolution Errors ====================
    /// No webhook token is attached to the request.
    #[error("Missing webhook_token cookie")]
    Unauthenticated,

    /// The request needs a live session and has none.
    #[error("No valid session")]
    SessionRequired,

    /// The token in the URL differs from the token in the cookie.
    #[error("Token mismatch")]
    TokenMismatch,

    // ==================== Quota Errors ====================
    /// The token has used up its quota for the current window.
    #[error("Rate limit exceeded for this token ({count}/{limit})")]
    RateLimited { count: u64, limit: u64 },

    // ==================== Validation Errors ====================
    /// The webhook body is not valid JSON.
    #[error("Invalid JSON body: {reason}")]
    InvalidPayload { reason: String },

    /// A required request field is missing.
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// The OAuth state returned by the provider does not match.
    #[error("Invalid OAuth state")]
    InvalidState,

    // ==================== Infrastructure Errors ====================
    /// The key-value store failed or timed out.
    #[error("Store error: {message}")]
    Infrastructure { message: String },

    /// The identity provider failed during login.
    #[error("Identity provider error: {message}")]
    IdentityProvider { message: String },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl InspectorError {
    /// Creates a new store error.
    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::Infrastructure {
            message: message.into(),
        }
    }

    /// Creates a new identity provider error.
    pub fn identity_provider(message: impl Into<String>) -> Self {
        Self::IdentityProvider {
            message: message.into(),
        }
    }

    /// Creates a new invalid payload error.
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }

    /// Creates a new missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns true if this is a client-side error (vs infrastructure).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated
                | Self::SessionRequired
                | Self::TokenMismatch
                | Self::RateLimited { .. }
                | Self::InvalidPayload { .. }
                | Self::MissingField { .. }
                | Self::InvalidState
        )
    }

    /// Returns true if the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Infrastructure { .. } | Self::IdentityProvider { .. }
        )
    }

    /// Returns an HTTP status code appropriate for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SessionRequired => 401,
            Self::Unauthenticated | Self::TokenMismatch => 403,
            Self::InvalidPayload { .. } | Self::MissingField { .. } | Self::InvalidState => 400,
            Self::RateLimited { .. } => 429,
            Self::Infrastructure { .. }
            | Self::IdentityProvider { .. }
            | Self::Serialization { .. }
            | Self::Configuration { .. } => 500,
        }
    }
}

/// A Result type alias using InspectorError.
pub type InspectorResult<T> = Result<T, InspectorError>;

impl From<serde_json::Error> for InspectorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
