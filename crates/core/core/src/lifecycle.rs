//! Token lifecycle: creation, login binding, rotation and logout.
//!
//! ```text
//! anonymous-fresh -> anonymous-active <-> privileged -> rotated
//! ```
//!
//! A token starts anonymous, becomes privileged once an identity owns it and
//! is retired by a reset, which hands the caller a new one.

use crate::error::InspectorResult;
use crate::events::EventStore;
use crate::rate_limit::RateLimiter;
use crate::session::{IdentityBindings, SessionStore};
use crate::token::generate_token;
use crate::types::{IssuedToken, Login, Tier};

#[derive(Clone)]
pub struct TokenLifecycle {
    bindings: IdentityBindings,
    sessions: SessionStore,
    events: EventStore,
    limiter: RateLimiter,
}

impl TokenLifecycle {
    pub fn new(
        bindings: IdentityBindings,
        sessions: SessionStore,
        events: EventStore,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            bindings,
            sessions,
            events,
            limiter,
        }
    }

    /// Issues a token: the identity's token for a live session, a fresh
    /// anonymous one otherwise.
    pub async fn create(&self, session: Option<&str>) -> InspectorResult<IssuedToken> {
        if let Some(identity) = self.session_identity(session).await? {
            let token = self.token_of_identity(&identity).await?;
            return Ok(IssuedToken {
                token,
                tier: Tier::Privileged,
            });
        }

        let token = generate_token();
        tracing::debug!(token = %token, "Issued anonymous token");
        Ok(IssuedToken {
            token,
            tier: Tier::Anonymous,
        })
    }

    /// Binds `identity` to its token, creating one on first login, and opens a
    /// session for it.
    pub async fn login(&self, identity: &str) -> InspectorResult<Login> {
        let token = self.token_of_identity(identity).await?;
        let session = self.sessions.create(identity).await?;
        tracing::info!(identity, token = %token, "Login completed");
        Ok(Login { token, session })
    }

    /// Retires `token`: drops its events, counter and owner, then issues a
    /// replacement that is rebound to the caller's identity when a session is
    /// live.
    pub async fn reset(&self, token: &str, session: Option<&str>) -> InspectorResult<IssuedToken> {
        let purged = self.events.delete_all(token).await?;
        self.limiter.reset(token).await?;
        self.bindings.clear_owner(token).await?;

        let new_token = generate_token();
        let tier = match self.session_identity(session).await? {
            Some(identity) => {
                self.bindings.rebind(&identity, &new_token).await?;
                self.bindings.set_owner(&new_token, &identity).await?;
                Tier::Privileged
            }
            None => Tier::Anonymous,
        };

        tracing::info!(old = token, new = %new_token, %tier, purged, "Token reset");
        Ok(IssuedToken {
            token: new_token,
            tier,
        })
    }

    /// Ends the session, if any, and issues a fresh anonymous token.
    pub async fn logout(&self, session: Option<&str>) -> InspectorResult<IssuedToken> {
        if let Some(handle) = session.filter(|h| !h.is_empty()) {
            self.sessions.end(handle).await?;
        }
        Ok(IssuedToken {
            token: generate_token(),
            tier: Tier::Anonymous,
        })
    }

    async fn session_identity(&self, session: Option<&str>) -> InspectorResult<Option<String>> {
        match session {
            Some(handle) => self.sessions.identity_for(handle).await,
            None => Ok(None),
        }
    }

    /// Looks up or creates the identity's token and mirrors it into ownership.
    async fn token_of_identity(&self, identity: &str) -> InspectorResult<String> {
        let token = match self.bindings.token_for(identity).await? {
            Some(token) => token,
            None => {
                self.bindings
                    .bind_if_absent(identity, &generate_token())
                    .await?
            }
        };
        self.bindings.set_owner(&token, identity).await?;
        Ok(token)
    }
}
