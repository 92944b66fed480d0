//! EphemeralChannel - the topic + queue pair observing one job.

use tracing::{debug, info, warn};

use crate::domain::{QueueArn, QueuePolicy, QueueUrl, SubscriptionArn, TopicArn};
use crate::error::Result;
use crate::ports::{NotificationClient, Protocol, QueueClient};

/// Resources created so far. Fields are filled one by one during
/// provisioning, so after a failure the channel still knows exactly what
/// has to be torn down.
#[derive(Debug, Default)]
pub struct EphemeralChannel {
    queue_url: Option<QueueUrl>,
    queue_arn: Option<QueueArn>,
    topic_arn: Option<TopicArn>,
    subscription: Option<SubscriptionArn>,
}

/// What teardown could not delete.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub failures: Vec<String>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl EphemeralChannel {
    /// Create the queue and topic called `name`, subscribe the queue to the
    /// topic, and let the topic deliver into the queue.
    pub async fn provision(
        &mut self,
        queues: &dyn QueueClient,
        notifications: &dyn NotificationClient,
        name: &str,
    ) -> Result<(QueueUrl, TopicArn)> {
        info!(name, "Setting queue up");
        let queue_url = queues.create_queue(name).await?;
        self.queue_url = Some(queue_url.clone());
        let queue_arn = queues.queue_arn(&queue_url).await?;
        self.queue_arn = Some(queue_arn.clone());

        info!(name, "Setting notification topic up");
        let topic = notifications.create_topic(name).await?;
        self.topic_arn = Some(topic.clone());
        let subscription = notifications
            .subscribe(&topic, &queue_arn, Protocol::Queue)
            .await?;
        self.subscription = Some(subscription);

        let policy = QueuePolicy::allow_topic(&queue_arn, &topic);
        debug!(queue = %queue_url, policy = %policy.to_json(), "Attaching queue policy");
        queues.set_access_policy(&queue_url, &policy).await?;

        info!(queue = %queue_url, topic = %topic, "Ephemeral channel ready");
        Ok((queue_url, topic))
    }

    /// Unsubscribe, delete the topic, delete the queue.
    ///
    /// Best effort: each failure is logged and recorded, never returned.
    /// Calling it again only retries what is still left.
    pub async fn teardown(
        &mut self,
        queues: &dyn QueueClient,
        notifications: &dyn NotificationClient,
    ) -> CleanupReport {
        let mut report = CleanupReport::default();

        if let Some(subscription) = self.subscription.take()
            && let Err(e) = notifications.unsubscribe(&subscription).await
        {
            warn!(subscription = %subscription, error = %e, "Unsubscribe failed");
            report.failures.push(e.to_string());
            if !e.is_not_found() {
                self.subscription = Some(subscription);
            }
        }

        if let Some(topic) = self.topic_arn.take()
            && let Err(e) = notifications.delete_topic(&topic).await
        {
            warn!(topic = %topic, error = %e, "Deleting topic failed");
            report.failures.push(e.to_string());
            if !e.is_not_found() {
                self.topic_arn = Some(topic);
            }
        }

        if let Some(queue) = self.queue_url.take()
            && let Err(e) = queues.delete_queue(&queue).await
        {
            warn!(queue = %queue, error = %e, "Deleting queue failed");
            report.failures.push(e.to_string());
            if !e.is_not_found() {
                self.queue_url = Some(queue);
            }
        }
        self.queue_arn = None;

        report
    }
}
