//! Per-token usage metering.

use crate::config::InspectorConfig;
use crate::error::{InspectorError, InspectorResult};
use crate::keys;
use crate::kv::KeyValueStore;
use crate::types::{Admission, Tier, UsageStatus};
use std::sync::Arc;

/// Rate limiter over the store's atomic counter.
///
/// Every counted request pushes the counter's expiry out to a full window, so
/// the count only drops back to zero after a window without requests.
/// Rejected requests are counted too.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    config: InspectorConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, config: InspectorConfig) -> Self {
        Self { store, config }
    }

    /// Counts one request against `token` and admits or rejects it.
    pub async fn try_consume(&self, token: &str, tier: Tier) -> InspectorResult<Admission> {
        let limit = self.config.limit_for(tier);
        let count = self
            .store
            .incr_with_ttl(&keys::usage_counter(token), self.config.rate_limit_ttl)
            .await?;

        if count > limit {
            tracing::warn!(token, %tier, count, limit, "Rate limit exceeded");
            return Err(InspectorError::RateLimited { count, limit });
        }

        Ok(Admission {
            count,
            remaining: limit - count,
            limit,
        })
    }

    /// Reads the counter of `token` without touching it.
    pub async fn status(&self, token: &str, tier: Tier) -> InspectorResult<UsageStatus> {
        let key = keys::usage_counter(token);
        let count = match self.store.get(&key).await? {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                InspectorError::infrastructure(format!("usage counter of {token} is not an integer"))
            })?,
            None => 0,
        };
        let ttl = self.store.ttl(&key).await?;

        Ok(UsageStatus {
            count,
            ttl,
            limit: self.config.limit_for(tier),
        })
    }

    /// Drops the counter of `token`.
    pub async fn reset(&self, token: &str) -> InspectorResult<()> {
        self.store.delete(&[keys::usage_counter(token)]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use std::time::Duration;

    fn limiter(anonymous: u64, privileged: u64) -> RateLimiter {
        let config = InspectorConfig::new()
            .anonymous_limit(anonymous)
            .privileged_limit(privileged)
            .rate_limit_ttl(Duration::from_secs(3_600));
        RateLimiter::new(Arc::new(MemoryStore::new()), config)
    }

    #[tokio::test]
    async fn test_admits_up_to_limit() {
        let limiter = limiter(3, 10);
        for expected in [2, 1, 0] {
            let admission = limiter.try_consume("abc", Tier::Anonymous).await.unwrap();
            assert_eq!(admission.remaining, expected);
            assert_eq!(admission.limit, 3);
        }

        let err = limiter.try_consume("abc", Tier::Anonymous).await.unwrap_err();
        assert!(matches!(err, InspectorError::RateLimited { count: 4, limit: 3 }));

        // Rejected calls keep counting.
        assert!(limiter.try_consume("abc", Tier::Anonymous).await.is_err());
        let status = limiter.status("abc", Tier::Anonymous).await.unwrap();
        assert_eq!(status.count, 5);
        assert_eq!(status.remaining(), 0);
    }

    #[tokio::test]
    async fn test_privileged_ceiling() {
        let limiter = limiter(1, 3);
        limiter.try_consume("abc", Tier::Privileged).await.unwrap();
        let admission = limiter.try_consume("abc", Tier::Privileged).await.unwrap();
        assert_eq!(admission.remaining, 1);

        // The same counter is judged against the tier of each request.
        assert!(limiter.try_consume("abc", Tier::Anonymous).await.is_err());
    }

    #[tokio::test]
    async fn test_status_of_unused_token() {
        let limiter = limiter(50, 500);
        let status = limiter.status("fresh", Tier::Anonymous).await.unwrap();
        assert_eq!(status.count, 0);
        assert_eq!(status.ttl, None);
        assert_eq!(status.remaining(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expires() {
        let limiter = limiter(1, 10);
        limiter.try_consume("abc", Tier::Anonymous).await.unwrap();
        assert!(limiter.try_consume("abc", Tier::Anonymous).await.is_err());

        let status = limiter.status("abc", Tier::Anonymous).await.unwrap();
        assert_eq!(status.ttl, Some(Duration::from_secs(3_600)));

        // A later attempt, even a rejected one, re-arms the full window.
        tokio::time::advance(Duration::from_secs(1_800)).await;
        assert!(limiter.try_consume("abc", Tier::Anonymous).await.is_err());
        let status = limiter.status("abc", Tier::Anonymous).await.unwrap();
        assert_eq!(status.ttl, Some(Duration::from_secs(3_600)));
        assert_eq!(status.count, 3);

        tokio::time::advance(Duration::from_secs(3_600)).await;
        let admission = limiter.try_consume("abc", Tier::Anonymous).await.unwrap();
        assert_eq!(admission.count, 1);
    }

    #[tokio::test]
    async fn test_reset() {
        let limiter = limiter(1, 10);
        limiter.try_consume("abc", Tier::Anonymous).await.unwrap();
        limiter.reset("abc").await.unwrap();
        assert_eq!(limiter.status("abc", Tier::Anonymous).await.unwrap().count, 0);
        assert!(limiter.try_consume("abc", Tier::Anonymous).await.is_ok());
    }
}
