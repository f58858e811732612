//! Pub/sub notifier collaborator.

use async_trait::async_trait;
use nova_common::Result;

use crate::effects::Notice;

/// Publishes notices to their targets.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a batch of notices.
    async fn send(&self, notices: &[Notice]) -> Result<()>;

    /// Send a single notice.
    async fn send_one(&self, notice: &Notice) -> Result<()> {
        self.send(std::slice::from_ref(notice)).await
    }
}
