//! Sessions and identity bindings.
//!
//! A session maps a short-lived handle to an identity. A binding maps an
//! identity to the one webhook token it owns, and the token back to its owner.

use crate::error::InspectorResult;
use crate::keys;
use crate::kv::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Session handles stored with the session TTL.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Opens a session for `identity` and returns its handle.
    pub async fn create(&self, identity: &str) -> InspectorResult<String> {
        let handle = Uuid::new_v4().to_string();
        self.store
            .set(&keys::session(&handle), identity, Some(self.ttl))
            .await?;
        tracing::info!(identity, "Session created");
        Ok(handle)
    }

    /// Identity behind a session handle, `None` when unknown or expired.
    ///
    /// Only handles issued by [`SessionStore::create`] are looked up; anything
    /// else could address a different key under `user:`.
    pub async fn identity_for(&self, handle: &str) -> InspectorResult<Option<String>> {
        if !is_session_handle(handle) {
            tracing::debug!("Ignoring malformed session handle");
            return Ok(None);
        }
        self.store.get(&keys::session(handle)).await
    }

    /// Ends a session. Unknown handles are ignored.
    pub async fn end(&self, handle: &str) -> InspectorResult<()> {
        if !is_session_handle(handle) {
            return Ok(());
        }
        let removed = self.store.delete(&[keys::session(handle)]).await?;
        tracing::debug!(removed, "Session ended");
        Ok(())
    }
}

/// Session handles are hyphenated UUIDs.
fn is_session_handle(handle: &str) -> bool {
    Uuid::parse_str(handle).is_ok_and(|id| id.hyphenated().to_string() == handle)
}

/// Identity to token bindings and token ownership.
#[derive(Clone)]
pub struct IdentityBindings {
    store: Arc<dyn KeyValueStore>,
}

impl IdentityBindings {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The token currently bound to `identity`.
    pub async fn token_for(&self, identity: &str) -> InspectorResult<Option<String>> {
        self.store.get(&keys::identity_token(identity)).await
    }

    /// Binds `candidate` to `identity` unless a binding already exists.
    ///
    /// Returns the token that ends up bound, which is the existing one when
    /// another request got there first.
    pub async fn bind_if_absent(&self, identity: &str, candidate: &str) -> InspectorResult<String> {
        let key = keys::identity_token(identity);
        if self.store.set_if_absent(&key, candidate, None).await? {
            tracing::info!(identity, token = candidate, "Bound new token to identity");
            return Ok(candidate.to_string());
        }

        match self.store.get(&key).await? {
            Some(existing) => Ok(existing),
            // The binding vanished between the two calls; take it over.
            None => {
                self.store.set(&key, candidate, None).await?;
                Ok(candidate.to_string())
            }
        }
    }

    /// Replaces the token bound to `identity`.
    pub async fn rebind(&self, identity: &str, token: &str) -> InspectorResult<()> {
        self.store
            .set(&keys::identity_token(identity), token, None)
            .await?;
        tracing::info!(identity, token, "Rebound identity to new token");
        Ok(())
    }

    /// Records `identity` as the owner of `token`.
    pub async fn set_owner(&self, token: &str, identity: &str) -> InspectorResult<()> {
        self.store
            .set(&keys::token_owner(token), identity, None)
            .await
    }

    /// Owner of `token`, `None` when anonymous.
    pub async fn owner_of(&self, token: &str) -> InspectorResult<Option<String>> {
        self.store.get(&keys::token_owner(token)).await
    }

    /// Drops the ownership record of `token`.
    pub async fn clear_owner(&self, token: &str) -> InspectorResult<()> {
        self.store.delete(&[keys::token_owner(token)]).await?;
        Ok(())
    }
}
