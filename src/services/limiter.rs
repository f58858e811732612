//! Rate limiter collaborator.

use async_trait::async_trait;
use nova_common::Result;

use crate::config::RateOptions;

/// Counts attempts per key over a sliding window.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record an attempt for `key`.
    ///
    /// Fails (normally with `Error::TooManyRequests`) when more than
    /// `options.limit` attempts fall within `options.window`.
    async fn attempt(&self, key: &str, options: &RateOptions) -> Result<()>;
}
