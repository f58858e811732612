//! Task queue collaborator.

use async_trait::async_trait;
use nova_common::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::effects::Task;

/// A message received from a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Backend-assigned message id, used to delete the message.
    pub id: String,
    /// Queue the message was read from.
    pub queue: String,
    /// Message body.
    pub payload: Value,
    /// How many times the message has been received.
    pub received_count: u32,
}

/// Message queue that tasks are dispatched to.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Enqueue one task, honoring its delay and TTL.
    async fn send(&self, task: &Task) -> Result<()>;

    /// Receive the next visible message from `queue`, if any.
    async fn receive(&self, queue: &str) -> Result<Option<QueueMessage>>;

    /// Acknowledge and remove a received message.
    async fn delete(&self, message: &QueueMessage) -> Result<()>;
}
