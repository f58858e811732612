use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Construction-time options for an [`Executor`](crate::Executor).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExecutorOptions {
    #[serde(default)]
    pub acquire: AcquireOptions,

    /// Options handed to the authenticator. Requires an authenticator.
    #[serde(default)]
    pub auth: Option<Value>,

    #[serde(default)]
    pub rate_limits: RateLimits,

    /// Default inputs; caller-supplied inputs take precedence.
    #[serde(default)]
    pub defaults: Map<String, Value>,
}

/// Options used when acquiring a store connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AcquireOptions {
    /// Start a transaction on the acquired connection.
    #[serde(default = "default_true")]
    pub start_transaction: bool,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            start_transaction: default_true(),
        }
    }
}

/// Per-action and per-caller rate limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimits {
    /// Keyed by caller and action name.
    #[serde(default)]
    pub local: Option<RateOptions>,

    /// Keyed by caller alone, shared by every action.
    #[serde(default)]
    pub global: Option<RateOptions>,
}

impl RateLimits {
    pub fn is_empty(&self) -> bool {
        self.local.is_none() && self.global.is_none()
    }
}

/// At most `limit` attempts per `window_ms` milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateOptions {
    pub window_ms: u64,
    pub limit: u32,
}

impl RateOptions {
    pub fn new(window: Duration, limit: u32) -> Self {
        Self {
            window_ms: window.as_millis() as u64,
            limit,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

fn default_true() -> bool {
    true
}
