//! Cache collaborator.

use std::time::Duration;

use async_trait::async_trait;
use nova_common::{Error, Result};
use serde_json::Value;

/// Shared key/value cache.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch values for `keys`, `None` for misses, in the same order.
    async fn get(&self, keys: &[String]) -> Result<Vec<Option<Value>>>;

    /// Store `value` under `key`, optionally expiring after `ttl`.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()>;

    /// Run a server-side script against `keys` with `params`.
    async fn execute(&self, script: &str, keys: &[String], params: &[Value]) -> Result<Value>;

    /// Evict `keys`.
    async fn clear(&self, keys: &[String]) -> Result<()>;

    /// Fetch a single key.
    async fn get_one(&self, key: &str) -> Result<Option<Value>> {
        let mut values = self.get(&[key.to_string()]).await?;
        Ok(values.pop().flatten())
    }
}

/// Stand-in used when no cache was configured; every call fails loudly.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCache;

fn unavailable() -> Error {
    Error::config("Cannot use cache: cache hasn't been initialized")
}

#[async_trait]
impl Cache for UnavailableCache {
    async fn get(&self, _keys: &[String]) -> Result<Vec<Option<Value>>> {
        Err(unavailable())
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Option<Duration>) -> Result<()> {
        Err(unavailable())
    }

    async fn execute(&self, _script: &str, _keys: &[String], _params: &[Value]) -> Result<Value> {
        Err(unavailable())
    }

    async fn clear(&self, _keys: &[String]) -> Result<()> {
        Err(unavailable())
    }
}
