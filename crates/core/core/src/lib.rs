//! # Webhook Inspector Core
//!
//! This crate provides the token-scoped webhook sink behind Webhook Inspector.
//! A caller holds an opaque token, webhooks addressed to that token are stored
//! with a TTL, and usage is metered per token in two tiers: anonymous, and
//! privileged once an identity owns the token.
//!
//! All state lives in an expiring key-value store ([`KeyValueStore`]) that is
//! injected into [`Inspector`]; the crate keeps no process-wide state.

pub mod config;
pub mod error;
pub mod events;
pub mod inspector;
pub mod keys;
pub mod kv;
pub mod lifecycle;
pub mod payload;
pub mod privilege;
pub mod rate_limit;
pub mod session;
pub mod token;
pub mod types;

// Re-export commonly used items at the crate root
pub use config::InspectorConfig;
pub use error::{InspectorError, InspectorResult};
pub use events::EventStore;
pub use inspector::{Ingested, Inspector};
pub use kv::{KeyValueStore, MemoryStore};
pub use lifecycle::TokenLifecycle;
pub use privilege::PrivilegeResolver;
pub use rate_limit::RateLimiter;
pub use session::{IdentityBindings, SessionStore};
pub use token::{generate_token, resolve_token};
pub use types::{
    Admission, Caller, HeaderValues, IncomingWebhook, IssuedToken, Login, Privilege, Tier,
    TokenStatus, UsageStatus, WebhookEvent,
};

#[cfg(feature = "redis")]
pub use kv::RedisStore;
