//! Token-scoped webhook event storage.

use crate::error::{InspectorError, InspectorResult};
use crate::keys;
use crate::kv::KeyValueStore;
use crate::types::{IncomingWebhook, WebhookEvent};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Stores each event under its own key so that every event expires on its own.
#[derive(Clone)]
pub struct EventStore {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl EventStore {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Persists a webhook under `token` and returns its id.
    ///
    /// The body must already be known to be UTF-8.
    pub async fn put(&self, token: &str, webhook: IncomingWebhook) -> InspectorResult<String> {
        let body = String::from_utf8(webhook.body)
            .map_err(|e| InspectorError::invalid_payload(e.to_string()))?;
        let event = WebhookEvent {
            id: Uuid::new_v4().to_string(),
            method: webhook.method,
            headers: webhook.headers,
            body,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event)?;
        self.store
            .set(&keys::event(token, &event.id), &json, Some(self.ttl))
            .await?;
        tracing::debug!(token, id = %event.id, "Stored webhook event");
        Ok(event.id)
    }

    /// All live events of `token`, oldest first.
    ///
    /// Entries that disappear during the listing or cannot be decoded are
    /// skipped.
    pub async fn list(&self, token: &str) -> InspectorResult<Vec<WebhookEvent>> {
        let keys = self.event_keys(token).await?;
        let mut events = Vec::with_capacity(keys.len());

        for key in keys {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<WebhookEvent>(&raw) {
                Ok(event) => events.push(event),
                Err(err) => tracing::warn!(key = %key, error = %err, "Skipping undecodable event"),
            }
        }

        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(events)
    }

    /// Deletes one event. Deleting an unknown id succeeds.
    pub async fn delete(&self, token: &str, id: &str) -> InspectorResult<()> {
        // An id with `:` would address an event of a longer token.
        if id.is_empty() || id.contains(':') {
            tracing::debug!(token, id, "Ignoring malformed event id");
            return Ok(());
        }
        let removed = self.store.delete(&[keys::event(token, id)]).await?;
        tracing::debug!(token, id, removed, "Deleted webhook event");
        Ok(())
    }

    /// Deletes every event of `token`, returning how many were removed.
    pub async fn delete_all(&self, token: &str) -> InspectorResult<u64> {
        let keys = self.event_keys(token).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let removed = self.store.delete(&keys).await?;
        tracing::info!(token, removed, "Deleted all webhook events");
        Ok(removed)
    }

    /// Event keys of `token` only. The prefix scan also matches tokens that
    /// extend `token` with `:`, so those keys are dropped here.
    async fn event_keys(&self, token: &str) -> InspectorResult<Vec<String>> {
        let mut found = self.store.scan_prefix(&keys::event_prefix(token)).await?;
        found.retain(|key| keys::event_id_of(token, key).is_some());
        Ok(found)
    }
}
