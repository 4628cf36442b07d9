//! # Webhook Inspector Server
//!
//! Standalone server that wires the inspector, its store, the GitHub login
//! provider and the Axum routes together.

mod config;

pub use config::{ConfigError, GitHubConfig, ServerConfig, parse_duration};

use axum::Router;
use std::sync::Arc;
use webhook_inspector_axum::{AppState, HttpSettings, router};
use webhook_inspector_core::{
    Inspector, InspectorError, KeyValueStore, MemoryStore, RedisStore,
};

/// Server startup error.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Inspector(#[from] InspectorError),
    #[error("Cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// The Webhook Inspector server.
pub struct InspectorServer {
    /// Server configuration.
    pub config: ServerConfig,
}

impl InspectorServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Builds the router, connecting to Redis when a URL is configured.
    pub async fn app(&self) -> Result<Router, ServerError> {
        let limits = self.config.inspector_config();
        limits.validate()?;

        let store = self.store().await?;
        let inspector = Inspector::new(store, limits);
        let mut state = AppState::new(inspector, HttpSettings::new(&self.config.frontend_url));

        let oauth = self.config.oauth_config();
        if oauth.is_configured() {
            tracing::info!(client_id = %oauth.client_id, "GitHub login enabled");
            state = state.with_provider(Arc::new(oauth.github()));
        } else {
            tracing::warn!("GITHUB_CLIENT_ID/GITHUB_CLIENT_SECRET not set; login is disabled");
        }

        Ok(router(state))
    }

    async fn store(&self) -> Result<Arc<dyn KeyValueStore>, InspectorError> {
        match &self.config.redis_url {
            Some(url) => Ok(Arc::new(
                RedisStore::connect(url, self.config.store_timeout).await?,
            )),
            None => {
                tracing::warn!("No Redis URL configured; data lives in process memory");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }

    /// Binds the listener and serves until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> Result<(), ServerError> {
        let app = self.app().await?;
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        tracing::info!(
            %addr,
            anonymous_limit = self.config.anonymous_rate_limit,
            privileged_limit = self.config.privileged_rate_limit,
            "Webhook Inspector listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

impl Default for InspectorServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_app_on_memory_store() {
        let app = InspectorServer::default().app().await.unwrap();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_login_disabled_without_credentials() {
        let app = InspectorServer::default().app().await.unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/github")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let mut config = ServerConfig::default();
        config.webhook_data_ttl = Duration::ZERO;
        let err = InspectorServer::new(config).app().await.unwrap_err();
        assert!(matches!(err, ServerError::Inspector(_)));
    }
}
