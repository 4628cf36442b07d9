//! Key-value store capability.
//!
//! All tokens, events, counters and bindings live in an expiring key-value
//! store that is injected into each component:
//! - `MemoryStore` keeps everything in process, for tests and local runs
//! - `RedisStore` (feature `redis`) talks to a Redis server

mod memory;
#[cfg(feature = "redis")]
mod redis;
mod trait_def;

pub use memory::MemoryStore;
pub use trait_def::KeyValueStore;

#[cfg(feature = "redis")]
pub use redis::RedisStore;
