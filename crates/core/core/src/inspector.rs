//! The `Inspector` facade wiring every component over one store.

use crate::config::InspectorConfig;
use crate::error::{InspectorError, InspectorResult};
use crate::events::EventStore;
use crate::kv::KeyValueStore;
use crate::lifecycle::TokenLifecycle;
use crate::payload;
use crate::privilege::PrivilegeResolver;
use crate::rate_limit::RateLimiter;
use crate::session::{IdentityBindings, SessionStore};
use crate::token::resolve_token;
use crate::types::{
    Admission, Caller, IncomingWebhook, IssuedToken, Login, TokenStatus, WebhookEvent,
};
use std::sync::Arc;

/// Outcome of an accepted webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub id: String,
    pub admission: Admission,
}

/// Entry point for every token-scoped operation.
///
/// Cheap to clone; all state lives in the injected store.
#[derive(Clone)]
pub struct Inspector {
    config: InspectorConfig,
    store: Arc<dyn KeyValueStore>,
    events: EventStore,
    limiter: RateLimiter,
    privileges: PrivilegeResolver,
    sessions: SessionStore,
    lifecycle: TokenLifecycle,
}

impl Inspector {
    pub fn new(store: Arc<dyn KeyValueStore>, config: InspectorConfig) -> Self {
        let bindings = IdentityBindings::new(store.clone());
        let sessions = SessionStore::new(store.clone(), config.session_ttl);
        let events = EventStore::new(store.clone(), config.event_ttl);
        let limiter = RateLimiter::new(store.clone(), config.clone());
        let privileges = PrivilegeResolver::new(bindings.clone(), sessions.clone());
        let lifecycle = TokenLifecycle::new(
            bindings,
            sessions.clone(),
            events.clone(),
            limiter.clone(),
        );

        Self {
            config,
            store,
            events,
            limiter,
            privileges,
            sessions,
            lifecycle,
        }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Accepts a webhook for the caller's token.
    ///
    /// The body is checked before anything is written, so an invalid payload
    /// costs no quota.
    pub async fn ingest(
        &self,
        caller: &Caller,
        path_token: Option<&str>,
        webhook: IncomingWebhook,
    ) -> InspectorResult<Ingested> {
        let token = resolve_token(caller.token(), path_token)?;
        let privilege = self.privileges.resolve(&token, caller.session()).await;

        if let Err(err) = payload::validate_json(&webhook.body) {
            tracing::warn!(
                token = %token,
                body = %payload::redact_for_log(&webhook.body),
                "Rejected invalid JSON body"
            );
            return Err(err);
        }

        let admission = self.limiter.try_consume(&token, privilege.tier).await?;
        let id = self.events.put(&token, webhook).await?;
        tracing::info!(
            token = %token,
            id = %id,
            tier = %privilege.tier,
            remaining = admission.remaining,
            "Webhook received"
        );

        Ok(Ingested { id, admission })
    }

    /// Events of the caller's token, oldest first.
    pub async fn list(&self, caller: &Caller) -> InspectorResult<Vec<WebhookEvent>> {
        let token = resolve_token(caller.token(), None)?;
        self.events.list(&token).await
    }

    /// Deletes one event of the caller's token.
    pub async fn delete(&self, caller: &Caller, id: &str) -> InspectorResult<()> {
        let token = resolve_token(caller.token(), None)?;
        self.events.delete(&token, id).await
    }

    /// Usage and privilege of the caller's token.
    pub async fn status(&self, caller: &Caller) -> InspectorResult<TokenStatus> {
        let token = resolve_token(caller.token(), None)?;
        let privilege = self.privileges.resolve(&token, caller.session()).await;
        let usage = self.limiter.status(&token, privilege.tier).await?;
        Ok(TokenStatus::new(&token, usage, &privilege))
    }

    /// Rotates the caller's token.
    pub async fn reset(&self, caller: &Caller) -> InspectorResult<IssuedToken> {
        let token = resolve_token(caller.token(), None)?;
        self.lifecycle.reset(&token, caller.session()).await
    }

    /// Issues a token to the caller.
    pub async fn create(&self, caller: &Caller) -> InspectorResult<IssuedToken> {
        self.lifecycle.create(caller.session()).await
    }

    /// Completes a login for an identity the provider vouched for.
    pub async fn login(&self, identity: &str) -> InspectorResult<Login> {
        self.lifecycle.login(identity).await
    }

    /// Identity behind the caller's session.
    pub async fn me(&self, caller: &Caller) -> InspectorResult<String> {
        let handle = caller.session().ok_or(InspectorError::SessionRequired)?;
        self.sessions
            .identity_for(handle)
            .await?
            .ok_or(InspectorError::SessionRequired)
    }

    /// Ends the caller's session and issues a fresh anonymous token.
    pub async fn logout(&self, caller: &Caller) -> InspectorResult<IssuedToken> {
        self.lifecycle.logout(caller.session()).await
    }

    /// Checks that the store answers.
    pub async fn ping(&self) -> InspectorResult<()> {
        self.store.ping().await
    }
}
