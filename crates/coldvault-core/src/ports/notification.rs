//! NotificationClient port - publish/subscribe topics.

use std::fmt;

use async_trait::async_trait;

use crate::domain::{QueueArn, SubscriptionArn, TopicArn};
use crate::error::Result;

/// Delivery protocol of a subscription. Only queue endpoints are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Queue,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Queue => f.write_str("sqs"),
        }
    }
}

#[async_trait]
pub trait NotificationClient: Send + Sync {
    /// Create (or return the existing) topic called `name`.
    async fn create_topic(&self, name: &str) -> Result<TopicArn>;

    async fn subscribe(
        &self,
        topic: &TopicArn,
        endpoint: &QueueArn,
        protocol: Protocol,
    ) -> Result<SubscriptionArn>;

    async fn unsubscribe(&self, subscription: &SubscriptionArn) -> Result<()>;

    async fn delete_topic(&self, topic: &TopicArn) -> Result<()>;
}
