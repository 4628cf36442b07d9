//! Identity provider trait and the GitHub implementation.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use webhook_inspector_core::InspectorError;

/// Credential obtained by exchanging an authorization code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// The access token.
    pub access_token: String,
    /// Token type (usually "bearer").
    pub token_type: String,
    /// Scopes granted.
    pub scope: Option<String>,
}

/// The identity a provider vouches for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    /// Provider's stable user ID.
    pub external_id: String,
    /// Human-readable handle (the GitHub login). Used as the identity key.
    pub handle: String,
}

/// Error type for identity provider operations.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("Invalid state")]
    InvalidState,
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),
    #[error("Failed to get user info: {0}")]
    UserInfoFailed(String),
    #[error("HTTP error: {0}")]
    HttpError(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for OAuthError {
    fn from(err: reqwest::Error) -> Self {
        OAuthError::HttpError(err.to_string())
    }
}

impl From<OAuthError> for InspectorError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::InvalidState => InspectorError::InvalidState,
            OAuthError::MissingField(field) => InspectorError::missing_field(field),
            other => InspectorError::identity_provider(other.to_string()),
        }
    }
}

/// An external identity provider driving the authorization-code flow.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the provider name (e.g., "github").
    fn name(&self) -> &str;

    /// URL to send the user to, carrying the CSRF `state`.
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError>;

    /// Exchanges the authorization code for a credential.
    async fn exchange(&self, code: &str) -> Result<Credential, OAuthError>;

    /// Fetches the identity behind a credential.
    async fn fetch_identity(&self, credential: &Credential) -> Result<ProviderIdentity, OAuthError>;
}

// ============================================================================
// GitHub OAuth Provider
// ============================================================================

/// GitHub OAuth provider.
#[derive(Debug, Clone)]
pub struct GitHubProvider {
    pub client_id: String,
    client_secret: String,
    redirect_url: Option<String>,
    scopes: Vec<String>,
    http_client: Client,
}

impl GitHubProvider {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: None,
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            http_client: Client::new(),
        }
    }

    /// Sets the callback URL registered with the GitHub app.
    ///
    /// Without one GitHub falls back to the app's configured callback.
    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    /// Replaces the requested scopes.
    pub fn scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    const AUTH_URL: &'static str = "https://github.com/login/oauth/authorize";
    const TOKEN_URL: &'static str = "https://github.com/login/oauth/access_token";
    const USERINFO_URL: &'static str = "https://api.github.com/user";
    const USER_AGENT: &'static str = "webhook-inspector";
    const DEFAULT_SCOPES: &'static [&'static str] = &["read:user", "user:email"];
}

/// GitHub answers token errors with 200 and an `error` field.
#[derive(Debug, Deserialize)]
struct GitHubTokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUserInfo {
    id: i64,
    login: String,
}

#[async_trait]
impl IdentityProvider for GitHubProvider {
    fn name(&self) -> &str {
        "github"
    }

    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        let scope = self.scopes.join(" ");
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
        ];
        if let Some(redirect) = &self.redirect_url {
            params.push(("redirect_uri", redirect.as_str()));
        }

        let url = Url::parse_with_params(Self::AUTH_URL, &params)
            .map_err(|e| OAuthError::InvalidUrl(e.to_string()))?;
        Ok(url.into())
    }

    async fn exchange(&self, code: &str) -> Result<Credential, OAuthError> {
        let mut params = vec![
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(redirect) = &self.redirect_url {
            params.push(("redirect_uri", redirect.as_str()));
        }

        let response = self
            .http_client
            .post(Self::TOKEN_URL)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OAuthError::TokenExchangeFailed(format!(
                "GitHub token exchange failed: {}",
                error_text
            )));
        }

        let token_response: GitHubTokenResponse = response.json().await?;
        credential_from(token_response)
    }

    async fn fetch_identity(&self, credential: &Credential) -> Result<ProviderIdentity, OAuthError> {
        let response = self
            .http_client
            .get(Self::USERINFO_URL)
            .header("User-Agent", Self::USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&credential.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(OAuthError::UserInfoFailed(format!(
                "GitHub user info failed ({}): {}",
                status, error_text
            )));
        }

        let user_info: GitHubUserInfo = response
            .json()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(e.to_string()))?;
        identity_from(user_info)
    }
}

fn credential_from(response: GitHubTokenResponse) -> Result<Credential, OAuthError> {
    if let Some(error) = response.error {
        let description = response.error_description.unwrap_or_default();
        return Err(OAuthError::TokenExchangeFailed(format!("{error}: {description}")));
    }

    let access_token = response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| OAuthError::MissingField("access_token".to_string()))?;

    Ok(Credential {
        access_token,
        token_type: response.token_type.unwrap_or_else(|| "bearer".to_string()),
        scope: response.scope,
    })
}

fn identity_from(user: GitHubUserInfo) -> Result<ProviderIdentity, OAuthError> {
    if user.login.is_empty() {
        return Err(OAuthError::UserInfoFailed("GitHub returned an empty login".to_string()));
    }
    Ok(ProviderIdentity {
        external_id: user.id.to_string(),
        handle: user.login,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url() {
        let provider = GitHubProvider::new("client-123", "secret")
            .redirect_url("http://localhost:8080/api/auth/github/callback");
        let url = Url::parse(&provider.authorization_url("st ate").unwrap()).unwrap();

        assert_eq!(url.host_str(), Some("github.com"));
        assert_eq!(url.path(), "/login/oauth/authorize");

        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("client_id".into(), "client-123".into())));
        assert!(query.contains(&("scope".into(), "read:user user:email".into())));
        assert!(query.contains(&("state".into(), "st ate".into())));
        assert!(query.contains(&(
            "redirect_uri".into(),
            "http://localhost:8080/api/auth/github/callback".into()
        )));
    }

    #[test]
    fn test_authorization_url_without_redirect() {
        let provider = GitHubProvider::new("client-123", "secret").scopes(["read:user"]);
        let url = provider.authorization_url("s").unwrap();
        assert!(!url.contains("redirect_uri"));
        assert!(url.contains("scope=read%3Auser"));
    }

    #[test]
    fn test_token_response_error() {
        let response: GitHubTokenResponse = serde_json::from_str(
            r#"{"error":"bad_verification_code","error_description":"The code passed is incorrect or expired."}"#,
        )
        .unwrap();
        let err = credential_from(response).unwrap_err();
        assert!(matches!(err, OAuthError::TokenExchangeFailed(ref msg) if msg.starts_with("bad_verification_code")));
    }

    #[test]
    fn test_token_response_success() {
        let response: GitHubTokenResponse = serde_json::from_str(
            r#"{"access_token":"gho_abc","token_type":"bearer","scope":"read:user,user:email"}"#,
        )
        .unwrap();
        let credential = credential_from(response).unwrap();
        assert_eq!(credential.access_token, "gho_abc");
        assert_eq!(credential.token_type, "bearer");
    }

    #[test]
    fn test_identity_from_user() {
        let user: GitHubUserInfo =
            serde_json::from_str(r#"{"id":583231,"login":"octocat","email":null}"#).unwrap();
        let identity = identity_from(user).unwrap();
        assert_eq!(identity.external_id, "583231");
        assert_eq!(identity.handle, "octocat");
    }

    #[test]
    fn test_error_mapping() {
        let err: InspectorError = OAuthError::InvalidState.into();
        assert_eq!(err.status_code(), 400);

        let err: InspectorError = OAuthError::MissingField("code".into()).into();
        assert!(matches!(err, InspectorError::MissingField { ref field } if field == "code"));

        let err: InspectorError = OAuthError::HttpError("connection reset".into()).into();
        assert!(matches!(err, InspectorError::IdentityProvider { .. }));
        assert_eq!(err.status_code(), 500);
    }
}
