//! # Webhook Inspector OAuth
//!
//! Identity provider support for Webhook Inspector. A successful login turns
//! an anonymous caller into an identity that can own a privileged token.
//!
//! ## Features
//!
//! - `IdentityProvider` trait for the authorization-code flow
//! - GitHub provider over `reqwest`
//! - CSRF protection via a state parameter round-tripped through a cookie
//!
//! ## Example
//!
//! ```rust,ignore
//! use webhook_inspector_oauth::{OAuthConfig, IdentityProvider};
//!
//! let provider = OAuthConfig::new("client_id", "client_secret")
//!     .redirect_url("https://hooks.example.com/api/auth/github/callback")
//!     .github();
//! let url = provider.authorization_url(&webhook_inspector_oauth::new_state())?;
//! ```

mod provider;

pub use provider::{Credential, GitHubProvider, IdentityProvider, OAuthError, ProviderIdentity};

use std::time::Duration;

/// How long a login attempt may take before its state is forgotten.
pub const STATE_TTL: Duration = Duration::from_secs(10 * 60);

/// GitHub OAuth app credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL (e.g., "https://hooks.example.com/api/auth/github/callback").
    pub redirect_url: Option<String>,
}

impl OAuthConfig {
    /// Creates a new OAuth config.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: None,
        }
    }

    /// Sets the callback URL.
    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    /// Returns true when both client id and secret are set.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Builds the GitHub provider for these credentials.
    pub fn github(&self) -> GitHubProvider {
        let provider = GitHubProvider::new(&self.client_id, &self.client_secret);
        match &self.redirect_url {
            Some(url) => provider.redirect_url(url),
            None => provider,
        }
    }
}

/// Generates a random CSRF state for one login attempt.
pub fn new_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Checks the state returned by the provider against the one issued.
pub fn verify_state(issued: Option<&str>, returned: Option<&str>) -> Result<(), OAuthError> {
    let returned = returned
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OAuthError::MissingField("state".to_string()))?;

    match issued {
        Some(issued) if issued == returned => Ok(()),
        _ => {
            tracing::warn!("OAuth state mismatch");
            Err(OAuthError::InvalidState)
        }
    }
}
