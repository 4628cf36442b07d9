//! Key schema for everything the service keeps in the store.
//!
//! Every key is derived here so that the layout can be tested without a live
//! store. The shapes are:
//!
//! | key                              | value          |
//! |----------------------------------|----------------|
//! | `hooks:{token}:{event_id}`       | event JSON     |
//! | `rate_limit:{token}`             | usage counter  |
//! | `token:{token}:owner`            | identity       |
//! | `user:{identity}:webhook_token`  | token          |
//! | `user:{session}`                 | identity       |

const HOOKS: &str = "hooks";
const RATE_LIMIT: &str = "rate_limit";
const TOKEN: &str = "token";
const USER: &str = "user";
const OWNER: &str = "owner";
const WEBHOOK_TOKEN: &str = "webhook_token";

/// A parsed store key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// A stored webhook event.
    Event { token: String, event_id: String },
    /// The usage counter of a token.
    UsageCounter { token: String },
    /// The identity owning a token.
    TokenOwner { token: String },
    /// The webhook token bound to an identity.
    IdentityToken { identity: String },
    /// A session handle.
    Session { handle: String },
}

impl Key {
    /// Renders the key in its store form.
    pub fn render(&self) -> String {
        match self {
            Key::Event { token, event_id } => event(token, event_id),
            Key::UsageCounter { token } => usage_counter(token),
            Key::TokenOwner { token } => token_owner(token),
            Key::IdentityToken { identity } => identity_token(identity),
            Key::Session { handle } => session(handle),
        }
    }

    /// Parses a store key.
    ///
    /// Tokens, event ids and session handles are UUIDs and never contain `:`;
    /// anything that does not fit one of the shapes yields `None`.
    pub fn parse(raw: &str) -> Option<Key> {
        let parts: Vec<&str> = raw.split(':').collect();
        match parts.as_slice() {
            [HOOKS, token, event_id] if !token.is_empty() && !event_id.is_empty() => {
                Some(Key::Event {
                    token: token.to_string(),
                    event_id: event_id.to_string(),
                })
            }
            [RATE_LIMIT, token] if !token.is_empty() => Some(Key::UsageCounter {
                token: token.to_string(),
            }),
            [TOKEN, token, OWNER] if !token.is_empty() => Some(Key::TokenOwner {
                token: token.to_string(),
            }),
            [USER, identity, WEBHOOK_TOKEN] if !identity.is_empty() => Some(Key::IdentityToken {
                identity: identity.to_string(),
            }),
            [USER, handle] if !handle.is_empty() => Some(Key::Session {
                handle: handle.to_string(),
            }),
            _ => None,
        }
    }
}

/// `hooks:{token}:{event_id}`
pub fn event(token: &str, event_id: &str) -> String {
    format!("{HOOKS}:{token}:{event_id}")
}

/// Prefix shared by every event of `token`.
pub fn event_prefix(token: &str) -> String {
    format!("{HOOKS}:{token}:")
}

/// `rate_limit:{token}`
pub fn usage_counter(token: &str) -> String {
    format!("{RATE_LIMIT}:{token}")
}

/// `token:{token}:owner`
pub fn token_owner(token: &str) -> String {
    format!("{TOKEN}:{token}:{OWNER}")
}

/// `user:{identity}:webhook_token`
pub fn identity_token(identity: &str) -> String {
    format!("{USER}:{identity}:{WEBHOOK_TOKEN}")
}

/// `user:{session}`
pub fn session(handle: &str) -> String {
    format!("{USER}:{handle}")
}

/// Extracts the event id from an event key belonging to `token`.
pub fn event_id_of<'a>(token: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(&event_prefix(token))
        .filter(|id| !id.is_empty() && !id.contains(':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        assert_eq!(event("abc", "e1"), "hooks:abc:e1");
        assert_eq!(event_prefix("abc"), "hooks:abc:");
        assert_eq!(usage_counter("abc"), "rate_limit:abc");
        assert_eq!(token_owner("abc"), "token:abc:owner");
        assert_eq!(identity_token("octocat"), "user:octocat:webhook_token");
        assert_eq!(session("s1"), "user:s1");
    }

    #[test]
    fn test_parse_every_shape() {
        let keys = [
            Key::Event {
                token: "t".into(),
                event_id: "e".into(),
            },
            Key::UsageCounter { token: "t".into() },
            Key::TokenOwner { token: "t".into() },
            Key::IdentityToken {
                identity: "octocat".into(),
            },
            Key::Session { handle: "s".into() },
        ];
        for key in keys {
            assert_eq!(Key::parse(&key.render()), Some(key));
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(Key::parse("hooks:abc"), None);
        assert_eq!(Key::parse("hooks::e1"), None);
        assert_eq!(Key::parse("token:abc:admin"), None);
        assert_eq!(Key::parse("rate_limit:"), None);
        assert_eq!(Key::parse("other:abc"), None);
        assert_eq!(Key::parse(""), None);
    }

    #[test]
    fn test_event_prefix_does_not_match_longer_token() {
        // "abc" must not see events of "abcd".
        assert!(!event("abcd", "e1").starts_with(&event_prefix("abc")));
        assert_eq!(event_id_of("abc", "hooks:abc:e1"), Some("e1"));
        assert_eq!(event_id_of("abc", "hooks:abcd:e1"), None);
        assert_eq!(event_id_of("abc", "hooks:abc:"), None);
    }
}
