//! Core data types for Webhook Inspector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Request headers as received, keeping repeated values.
pub type HeaderValues = BTreeMap<String, Vec<String>>;

/// Usage tier of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// No identity owns the token.
    Anonymous,
    /// The token is owned by the identity of the caller.
    Privileged,
}

impl Tier {
    /// Returns true for the privileged tier.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Tier::Privileged)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Anonymous => write!(f, "anonymous"),
            Tier::Privileged => write!(f, "privileged"),
        }
    }
}

/// Credentials a request carries: its webhook token and session handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub token: Option<String>,
    pub session: Option<String>,
}

impl Caller {
    pub fn new(token: Option<String>, session: Option<String>) -> Self {
        Self { token, session }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }
}

/// A webhook as it arrives, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingWebhook {
    /// HTTP method of the delivery.
    pub method: String,
    /// All request headers.
    pub headers: HeaderValues,
    /// Raw request body.
    pub body: Vec<u8>,
}

impl IncomingWebhook {
    /// Creates an incoming webhook.
    pub fn new(method: impl Into<String>, headers: HeaderValues, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: method.into(),
            headers,
            body: body.into(),
        }
    }
}

/// A stored webhook event.
///
/// The body is kept verbatim; it has been checked to be valid JSON before
/// being accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Unique identifier of the event within its token.
    pub id: String,
    /// HTTP method of the delivery.
    pub method: String,
    /// Request headers of the delivery.
    pub headers: HeaderValues,
    /// Raw JSON body.
    pub body: String,
    /// When the delivery was received.
    pub timestamp: DateTime<Utc>,
}

/// The outcome of an admitted unit of usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Admission {
    /// Counter value after this request.
    pub count: u64,
    /// Requests left in the window.
    pub remaining: u64,
    /// Ceiling that applied.
    pub limit: u64,
}

/// Read-only view of a usage counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageStatus {
    /// Requests counted in the current window (rejected ones included).
    pub count: u64,
    /// Time until the window closes, `None` when no window is open.
    pub ttl: Option<Duration>,
    /// Ceiling for the tier the status was read for.
    pub limit: u64,
}

impl UsageStatus {
    /// Requests left in the window, never negative.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }
}

/// The tier of a token for one request, with the owning identity if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Privilege {
    pub tier: Tier,
    pub owner: Option<String>,
}

impl Privilege {
    /// An anonymous token with no owner.
    pub fn anonymous() -> Self {
        Self {
            tier: Tier::Anonymous,
            owner: None,
        }
    }
}

/// Response of the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenStatus {
    pub token: String,
    pub requests_used: u64,
    pub requests_remaining: u64,
    pub limit: u64,
    /// Remaining window rendered as `"{h}h {m}m"`.
    pub ttl: String,
    pub ttl_seconds: u64,
    /// Owning identity, empty when anonymous.
    pub owner: String,
    pub privileged: bool,
}

impl TokenStatus {
    pub(crate) fn new(token: &str, usage: UsageStatus, privilege: &Privilege) -> Self {
        let ttl_seconds = usage.ttl.map(|ttl| ttl.as_secs()).unwrap_or(0);
        Self {
            token: token.to_string(),
            requests_used: usage.count,
            requests_remaining: usage.remaining(),
            limit: usage.limit,
            ttl: format_ttl(ttl_seconds),
            ttl_seconds,
            owner: privilege.owner.clone().unwrap_or_default(),
            privileged: privilege.tier.is_privileged(),
        }
    }
}

/// A webhook token issued to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub tier: Tier,
}

/// Result of a completed login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    /// Privileged token bound to the identity.
    pub token: String,
    /// Handle of the new session.
    pub session: String,
}

/// Formats whole seconds as `"{h}h {m}m"`.
pub fn format_ttl(seconds: u64) -> String {
    format!("{}h {}m", seconds / 3600, (seconds / 60) % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ttl() {
        assert_eq!(format_ttl(0), "0h 0m");
        assert_eq!(format_ttl(59), "0h 0m");
        assert_eq!(format_ttl(3_661), "1h 1m");
        assert_eq!(format_ttl(86_400), "24h 0m");
    }

    #[test]
    fn test_remaining_saturates() {
        let status = UsageStatus {
            count: 51,
            ttl: None,
            limit: 50,
        };
        assert_eq!(status.remaining(), 0);
    }

    #[test]
    fn test_event_json_shape() {
        let mut headers = HeaderValues::new();
        headers.insert("Content-Type".into(), vec!["application/json".into()]);
        let event = WebhookEvent {
            id: "abc123".into(),
            method: "POST".into(),
            headers,
            body: r#"{"foo":"bar"}"#.into(),
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["id"], "abc123");
        assert_eq!(value["method"], "POST");
        assert_eq!(value["headers"]["Content-Type"][0], "application/json");
        assert_eq!(value["body"], r#"{"foo":"bar"}"#);
        assert_eq!(value["timestamp"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Tier::Privileged).unwrap(), "\"privileged\"");
        assert_eq!(Tier::Anonymous.to_string(), "anonymous");
    }
}
