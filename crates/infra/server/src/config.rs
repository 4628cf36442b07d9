//! Server configuration.
//!
//! Values come from an optional TOML file and are then overridden by
//! environment variables. Durations accept plain seconds (`86400`) or unit
//! suffixes (`90s`, `15m`, `24h`, `3d`, `1h30m`).

use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use webhook_inspector_axum::DEFAULT_FRONTEND_URL;
use webhook_inspector_core::InspectorConfig;
use webhook_inspector_oauth::OAuthConfig;

/// Server-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Redis connection URL. The in-memory store is used when unset.
    pub redis_url: Option<String>,
    pub anonymous_rate_limit: u64,
    pub privileged_rate_limit: u64,
    #[serde(deserialize_with = "duration")]
    pub webhook_data_ttl: Duration,
    #[serde(deserialize_with = "duration")]
    pub rate_limit_ttl: Duration,
    #[serde(deserialize_with = "duration")]
    pub session_cookie_ttl: Duration,
    /// Upper bound on every store command.
    #[serde(deserialize_with = "duration")]
    pub store_timeout: Duration,
    /// Dashboard URL used by the login and logout redirects.
    pub frontend_url: String,
    pub github: GitHubConfig,
}

/// GitHub OAuth app settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let limits = InspectorConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            redis_url: None,
            anonymous_rate_limit: limits.anonymous_limit,
            privileged_rate_limit: limits.privileged_limit,
            webhook_data_ttl: limits.event_ttl,
            rate_limit_ttl: limits.rate_limit_ttl,
            session_cookie_ttl: limits.session_ttl,
            store_timeout: Duration::from_secs(5),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            github: GitHubConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads the file at `path` when given, then applies the process
    /// environment.
    pub fn from_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading configuration file");
                Self::load(path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overrides fields from environment-style variables. Empty values are
    /// treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = var("HOST") {
            self.host = host;
        }
        if let Some(port) = var("PORT") {
            self.port = parse_number("PORT", &port)?;
        }
        if let Some(url) = var("REDIS_URL") {
            self.redis_url = Some(url);
        } else if let Some(addr) = var("REDIS_ADDR") {
            self.redis_url = Some(redis_url_from_addr(&addr));
        }
        if let Some(limit) = var("ANONYMOUS_RATE_LIMIT") {
            self.anonymous_rate_limit = parse_number("ANONYMOUS_RATE_LIMIT", &limit)?;
        }
        if let Some(limit) = var("PRIVILEGED_RATE_LIMIT") {
            self.privileged_rate_limit = parse_number("PRIVILEGED_RATE_LIMIT", &limit)?;
        }
        for (key, field) in [
            ("WEBHOOK_DATA_TTL", &mut self.webhook_data_ttl),
            ("RATE_LIMIT_TTL", &mut self.rate_limit_ttl),
            ("SESSION_COOKIE_TTL", &mut self.session_cookie_ttl),
            ("STORE_TIMEOUT", &mut self.store_timeout),
        ] {
            if let Some(value) = var(key) {
                *field = parse_duration(&value)?;
            }
        }
        if let Some(id) = var("GITHUB_CLIENT_ID") {
            self.github.client_id = id;
        }
        if let Some(secret) = var("GITHUB_CLIENT_SECRET") {
            self.github.client_secret = secret;
        }
        if let Some(url) = var("OAUTH_REDIRECT_URL") {
            self.github.redirect_url = Some(url);
        }
        if let Some(url) = var("FRONTEND_URL") {
            self.frontend_url = url;
        }
        Ok(())
    }

    /// Address the listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Limits and TTLs for the inspector.
    pub fn inspector_config(&self) -> InspectorConfig {
        InspectorConfig::new()
            .anonymous_limit(self.anonymous_rate_limit)
            .privileged_limit(self.privileged_rate_limit)
            .event_ttl(self.webhook_data_ttl)
            .rate_limit_ttl(self.rate_limit_ttl)
            .session_ttl(self.session_cookie_ttl)
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        let config = OAuthConfig::new(&self.github.client_id, &self.github.client_secret);
        match &self.github.redirect_url {
            Some(url) => config.redirect_url(url),
            None => config,
        }
    }
}

/// Parses `86400`, `90s`, `15m`, `24h`, `3d` or combinations like `1h30m`.
pub fn parse_duration(text: &str) -> Result<Duration, ConfigError> {
    let text = text.trim();
    let invalid = || ConfigError::InvalidDuration(text.to_string());

    if text.is_empty() {
        return Err(invalid());
    }
    if let Ok(secs) = text.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total: u64 = 0;
    let mut rest = text;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(invalid());
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let scale = match &rest[..unit] {
            "s" => 1,
            "m" => 60,
            "h" => 60 * 60,
            "d" => 24 * 60 * 60,
            _ => return Err(invalid()),
        };
        rest = &rest[unit..];

        total = value
            .checked_mul(scale)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(invalid)?;
    }
    Ok(Duration::from_secs(total))
}

fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// `REDIS_ADDR` holds `host:port`; anything with a scheme is used as is.
fn redis_url_from_addr(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("redis://{addr}")
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.redis_url, None);
        assert_eq!(config.inspector_config(), InspectorConfig::default());
        assert!(!config.oauth_config().is_configured());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("86400").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("24h").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("3d").unwrap(), Duration::from_secs(259_200));
        assert_eq!(parse_duration(" 1h30m ").unwrap(), Duration::from_secs(5_400));

        for bad in ["", "h", "10x", "1.5h", "-3s", "5m3"] {
            assert!(
                matches!(parse_duration(bad), Err(ConfigError::InvalidDuration(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_toml_file() {
        let config = ServerConfig::from_toml_str(
            r#"
            port = 9000
            redis_url = "redis://cache:6379"
            anonymous_rate_limit = 5
            webhook_data_ttl = "12h"
            rate_limit_ttl = 3600

            [github]
            client_id = "Iv1.abc"
            client_secret = "shh"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.anonymous_rate_limit, 5);
        assert_eq!(config.privileged_rate_limit, 500);
        assert_eq!(config.webhook_data_ttl, Duration::from_secs(43_200));
        assert_eq!(config.rate_limit_ttl, Duration::from_secs(3_600));
        assert!(config.oauth_config().is_configured());
    }

    #[test]
    fn test_toml_rejects_bad_duration() {
        let err = ServerConfig::from_toml_str(r#"store_timeout = "soon""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::from_toml_str("port = 9000").unwrap();
        config
            .apply_env(env(&[
                ("PORT", "3000"),
                ("REDIS_ADDR", "localhost:6379"),
                ("PRIVILEGED_RATE_LIMIT", "1000"),
                ("SESSION_COOKIE_TTL", "3600"),
                ("STORE_TIMEOUT", "2s"),
                ("FRONTEND_URL", "https://hooks.example.com/dashboard"),
                ("HOST", ""),
            ]))
            .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.privileged_rate_limit, 1000);
        assert_eq!(config.session_cookie_ttl, Duration::from_secs(3_600));
        assert_eq!(config.store_timeout, Duration::from_secs(2));
        assert_eq!(config.frontend_url, "https://hooks.example.com/dashboard");
    }

    #[test]
    fn test_redis_url_wins_over_addr() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env(&[
                ("REDIS_ADDR", "localhost:6379"),
                ("REDIS_URL", "rediss://user:pw@cache:6380/1"),
            ]))
            .unwrap();
        assert_eq!(
            config.redis_url.as_deref(),
            Some("rediss://user:pw@cache:6380/1")
        );
    }

    #[test]
    fn test_env_rejects_garbage() {
        let mut config = ServerConfig::default();
        let err = config.apply_env(env(&[("ANONYMOUS_RATE_LIMIT", "lots")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "ANONYMOUS_RATE_LIMIT", .. }
        ));
    }
}
