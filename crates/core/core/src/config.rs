//! Quota and expiry configuration.

use crate::error::{InspectorError, InspectorResult};
use crate::types::Tier;
use std::time::Duration;

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

/// Limits and TTLs shared by every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorConfig {
    /// Ceiling for tokens without an owning identity.
    pub anonymous_limit: u64,
    /// Ceiling for tokens bound to an authenticated identity.
    pub privileged_limit: u64,
    /// How long a stored webhook event lives.
    pub event_ttl: Duration,
    /// Length of the usage counter window.
    pub rate_limit_ttl: Duration,
    /// Lifetime of sessions and of the token cookies.
    pub session_ttl: Duration,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            anonymous_limit: 50,
            privileged_limit: 500,
            event_ttl: Duration::from_secs(DAY),
            rate_limit_ttl: Duration::from_secs(DAY),
            session_ttl: Duration::from_secs(3 * DAY),
        }
    }
}

impl InspectorConfig {
    /// Creates a config with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the anonymous ceiling.
    pub fn anonymous_limit(mut self, limit: u64) -> Self {
        self.anonymous_limit = limit;
        self
    }

    /// Sets the privileged ceiling.
    pub fn privileged_limit(mut self, limit: u64) -> Self {
        self.privileged_limit = limit;
        self
    }

    /// Sets the event TTL.
    pub fn event_ttl(mut self, ttl: Duration) -> Self {
        self.event_ttl = ttl;
        self
    }

    /// Sets the usage window TTL.
    pub fn rate_limit_ttl(mut self, ttl: Duration) -> Self {
        self.rate_limit_ttl = ttl;
        self
    }

    /// Sets the session TTL.
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Returns the ceiling that applies to `tier`.
    pub fn limit_for(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Anonymous => self.anonymous_limit,
            Tier::Privileged => self.privileged_limit,
        }
    }

    /// Rejects configurations the store cannot honour.
    pub fn validate(&self) -> InspectorResult<()> {
        for (name, ttl) in [
            ("event_ttl", self.event_ttl),
            ("rate_limit_ttl", self.rate_limit_ttl),
            ("session_ttl", self.session_ttl),
        ] {
            if ttl.as_secs() == 0 {
                return Err(InspectorError::config(format!(
                    "{name} must be at least one second"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InspectorConfig::default();
        assert_eq!(config.anonymous_limit, 50);
        assert_eq!(config.privileged_limit, 500);
        assert_eq!(config.event_ttl, Duration::from_secs(86_400));
        assert_eq!(config.rate_limit_ttl, Duration::from_secs(86_400));
        assert_eq!(config.session_ttl, Duration::from_secs(259_200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_limit_for_tier() {
        let config = InspectorConfig::new().anonymous_limit(3).privileged_limit(7);
        assert_eq!(config.limit_for(Tier::Anonymous), 3);
        assert_eq!(config.limit_for(Tier::Privileged), 7);
    }

    #[test]
    fn test_sub_second_ttl_rejected() {
        let config = InspectorConfig::new().event_ttl(Duration::from_millis(500));
        assert!(matches!(
            config.validate(),
            Err(InspectorError::Configuration { .. })
        ));
    }
}
