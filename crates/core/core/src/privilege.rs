//! Privilege resolution.

use crate::session::{IdentityBindings, SessionStore};
use crate::types::{Privilege, Tier};

/// Decides whether a token is privileged for the current request.
///
/// A token is privileged when it has an owner and, if a session is attached,
/// the session belongs to that owner. Resolution only reads; store failures
/// resolve to anonymous.
#[derive(Clone)]
pub struct PrivilegeResolver {
    bindings: IdentityBindings,
    sessions: SessionStore,
}

impl PrivilegeResolver {
    pub fn new(bindings: IdentityBindings, sessions: SessionStore) -> Self {
        Self { bindings, sessions }
    }

    pub async fn resolve(&self, token: &str, session: Option<&str>) -> Privilege {
        let owner = match self.bindings.owner_of(token).await {
            Ok(Some(owner)) => owner,
            Ok(None) => return Privilege::anonymous(),
            Err(err) => {
                tracing::warn!(token, error = %err, "Owner lookup failed, treating token as anonymous");
                return Privilege::anonymous();
            }
        };

        let tier = match session {
            None => Tier::Privileged,
            Some(handle) => match self.sessions.identity_for(handle).await {
                Ok(Some(identity)) if identity == owner => Tier::Privileged,
                Ok(_) => {
                    tracing::debug!(token, owner = %owner, "Session does not belong to owner");
                    Tier::Anonymous
                }
                Err(err) => {
                    tracing::warn!(token, error = %err, "Session lookup failed");
                    Tier::Anonymous
                }
            },
        };

        Privilege {
            tier,
            owner: Some(owner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KeyValueStore, MemoryStore};
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        resolver: PrivilegeResolver,
        bindings: IdentityBindings,
        sessions: SessionStore,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let bindings = IdentityBindings::new(store.clone());
        let sessions = SessionStore::new(store, Duration::from_secs(3_600));
        Fixture {
            resolver: PrivilegeResolver::new(bindings.clone(), sessions.clone()),
            bindings,
            sessions,
        }
    }

    #[tokio::test]
    async fn test_unowned_is_anonymous() {
        let f = fixture();
        let privilege = f.resolver.resolve("t1", None).await;
        assert_eq!(privilege, Privilege::anonymous());
    }

    #[tokio::test]
    async fn test_owned_without_session() {
        let f = fixture();
        f.bindings.set_owner("t1", "octocat").await.unwrap();

        let privilege = f.resolver.resolve("t1", None).await;
        assert_eq!(privilege.tier, Tier::Privileged);
        assert_eq!(privilege.owner.as_deref(), Some("octocat"));
    }

    #[tokio::test]
    async fn test_owner_session() {
        let f = fixture();
        f.bindings.set_owner("t1", "octocat").await.unwrap();
        let handle = f.sessions.create("octocat").await.unwrap();

        let privilege = f.resolver.resolve("t1", Some(&handle)).await;
        assert!(privilege.tier.is_privileged());
    }

    #[tokio::test]
    async fn test_foreign_or_unknown_session_downgrades() {
        let f = fixture();
        f.bindings.set_owner("t1", "octocat").await.unwrap();
        let handle = f.sessions.create("hubot").await.unwrap();

        let privilege = f.resolver.resolve("t1", Some(&handle)).await;
        assert_eq!(privilege.tier, Tier::Anonymous);
        // The owner is still reported.
        assert_eq!(privilege.owner.as_deref(), Some("octocat"));

        let privilege = f.resolver.resolve("t1", Some("expired")).await;
        assert_eq!(privilege.tier, Tier::Anonymous);

        // The binding itself is untouched.
        assert_eq!(
            f.bindings.owner_of("t1").await.unwrap().as_deref(),
            Some("octocat")
        );
    }
}
