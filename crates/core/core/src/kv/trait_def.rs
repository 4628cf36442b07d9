use crate::error::InspectorResult;
use async_trait::async_trait;
use std::time::Duration;

/// Expiring key-value store the service keeps all of its state in.
///
/// Implementations must make [`KeyValueStore::incr_with_ttl`] and
/// [`KeyValueStore::set_if_absent`] atomic with respect to concurrent callers
/// on the same key. Nothing else is transactional: multi-key operations can
/// interleave with concurrent writers.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a string value.
    async fn get(&self, key: &str) -> InspectorResult<Option<String>>;

    /// Writes a value, replacing any previous value and expiry.
    ///
    /// `ttl` of `None` stores the key without an expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> InspectorResult<()>;

    /// Writes a value only if the key does not exist.
    ///
    /// Returns true when the value was written.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> InspectorResult<bool>;

    /// Atomically increments an integer counter and re-arms its expiry.
    ///
    /// A missing key counts from zero. Every increment resets the expiry to
    /// `ttl`, so the counter lives until `ttl` passes without an increment.
    /// Returns the value after the increment.
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> InspectorResult<u64>;

    /// Time left before `key` expires.
    ///
    /// `None` when the key does not exist or has no expiry.
    async fn ttl(&self, key: &str) -> InspectorResult<Option<Duration>>;

    /// Lists every key starting with `prefix`.
    async fn scan_prefix(&self, prefix: &str) -> InspectorResult<Vec<String>>;

    /// Deletes keys, ignoring the ones that do not exist.
    ///
    /// Returns the number of keys that were removed.
    async fn delete(&self, keys: &[String]) -> InspectorResult<u64>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> InspectorResult<()> {
        Ok(())
    }
}
