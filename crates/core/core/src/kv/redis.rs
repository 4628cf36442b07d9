use super::trait_def::KeyValueStore;
use crate::error::{InspectorError, InspectorResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Cmd, FromRedisValue, Script};
use std::future::Future;
use std::time::Duration;

/// Increments a counter and re-arms its expiry, in one step.
const INCR_WITH_TTL: &str = r"
local count = redis.call('INCR', KEYS[1])
redis.call('EXPIRE', KEYS[1], ARGV[1])
return count
";

const SCAN_BATCH: u32 = 100;

/// Redis implementation of KeyValueStore
///
/// Every command is bounded by `timeout`; a command that does not answer in
/// time fails with an infrastructure error and is not retried.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    timeout: Duration,
    incr_script: Script,
}

impl RedisStore {
    /// Connects to the Redis server at `url` (e.g. `redis://localhost:6379`).
    pub async fn connect(url: &str, timeout: Duration) -> InspectorResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| InspectorError::config(format!("invalid Redis URL {url}: {e}")))?;
        let conn = bounded(timeout, "CONNECT", ConnectionManager::new(client)).await?;
        tracing::info!(url, "Connected to Redis");

        Ok(Self {
            conn,
            timeout,
            incr_script: Script::new(INCR_WITH_TTL),
        })
    }

    async fn query<T: FromRedisValue>(&self, op: &'static str, cmd: &Cmd) -> InspectorResult<T> {
        let mut conn = self.conn.clone();
        bounded(self.timeout, op, cmd.query_async(&mut conn)).await
    }
}

async fn bounded<T, F>(timeout: Duration, op: &'static str, fut: F) -> InspectorResult<T>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(InspectorError::infrastructure(format!("{op} failed: {err}"))),
        Err(_) => Err(InspectorError::infrastructure(format!(
            "{op} timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Escapes glob metacharacters so a prefix matches literally in SCAN.
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Whole seconds for EX/EXPIRE, never zero.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> InspectorResult<Option<String>> {
        self.query("GET", redis::cmd("GET").arg(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> InspectorResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl_secs(ttl));
        }
        self.query("SET", &cmd).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> InspectorResult<bool> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl_secs(ttl));
        }
        let reply: redis::Value = self.query("SET NX", &cmd).await?;
        Ok(!matches!(reply, redis::Value::Nil))
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> InspectorResult<u64> {
        let mut conn = self.conn.clone();
        let mut invocation = self.incr_script.key(key);
        invocation.arg(ttl_secs(ttl));
        bounded(self.timeout, "INCR", invocation.invoke_async(&mut conn)).await
    }

    async fn ttl(&self, key: &str) -> InspectorResult<Option<Duration>> {
        let secs: i64 = self.query("TTL", redis::cmd("TTL").arg(key)).await?;
        // -2: no such key, -1: no expiry
        Ok((secs >= 0).then(|| Duration::from_secs(secs as u64)))
    }

    async fn scan_prefix(&self, prefix: &str) -> InspectorResult<Vec<String>> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = self
                .query(
                    "SCAN",
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH),
                )
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once.
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn delete(&self, keys: &[String]) -> InspectorResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(key);
        }
        self.query("DEL", &cmd).await
    }

    async fn ping(&self) -> InspectorResult<()> {
        self.query("PING", &redis::cmd("PING")).await
    }
}
