//! QueueClient port - ephemeral message queues.

use async_trait::async_trait;

use crate::domain::{QueuePolicy, QueueArn, QueueUrl};
use crate::error::Result;

/// A message as received from a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub message_id: String,
    pub body: String,
}

#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Create (or return the existing) queue called `name`.
    async fn create_queue(&self, name: &str) -> Result<QueueUrl>;

    async fn queue_arn(&self, queue: &QueueUrl) -> Result<QueueArn>;

    async fn set_access_policy(&self, queue: &QueueUrl, policy: &QueuePolicy) -> Result<()>;

    /// Non-blocking poll. Returns an empty batch when nothing is waiting.
    async fn receive_messages(&self, queue: &QueueUrl, max_batch: usize) -> Result<Vec<Message>>;

    async fn delete_queue(&self, queue: &QueueUrl) -> Result<()>;
}
