//! InMemoryBroker - in-process queues and topics.
//!
//! Implements both [`QueueClient`] and [`NotificationClient`], so a topic
//! can fan messages out to its subscribed queues inside one process. The
//! ephemeral channel only has to live for one invocation, which makes an
//! in-process broker a complete backend for the local mode.
//!
//! Behaviour mirrors the hosted services where the coordinator cares:
//! - a queue only accepts deliveries its access policy allows; anything else
//!   is dropped without an error
//! - creating a queue or topic with an existing name returns the existing one
//! - deleting a topic drops its subscriptions

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{DeliveryEnvelope, QueueArn, QueuePolicy, QueueUrl, SubscriptionArn, TopicArn};
use crate::error::{ColdVaultError, Result};
use crate::ports::{Clock, IdGenerator, Message, NotificationClient, Protocol, QueueClient};

/// Broker operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerOp {
    CreateQueue,
    QueueArn,
    SetAccessPolicy,
    ReceiveMessages,
    DeleteQueue,
    CreateTopic,
    Subscribe,
    Unsubscribe,
    DeleteTopic,
}

impl BrokerOp {
    fn name(self) -> &'static str {
        match self {
            BrokerOp::CreateQueue => "create_queue",
            BrokerOp::QueueArn => "queue_arn",
            BrokerOp::SetAccessPolicy => "set_access_policy",
            BrokerOp::ReceiveMessages => "receive_messages",
            BrokerOp::DeleteQueue => "delete_queue",
            BrokerOp::CreateTopic => "create_topic",
            BrokerOp::Subscribe => "subscribe",
            BrokerOp::Unsubscribe => "unsubscribe",
            BrokerOp::DeleteTopic => "delete_topic",
        }
    }
}

struct QueueRecord {
    arn: QueueArn,
    policy: Option<QueuePolicy>,
    messages: VecDeque<Message>,
}

struct SubscriptionRecord {
    topic: TopicArn,
    endpoint: QueueArn,
}

#[derive(Default)]
struct BrokerState {
    queues: HashMap<QueueUrl, QueueRecord>,
    queues_by_name: HashMap<String, QueueUrl>,
    topics: HashMap<String, TopicArn>,
    subscriptions: HashMap<SubscriptionArn, SubscriptionRecord>,
    faults: Vec<BrokerOp>,
}

impl BrokerState {
    fn take_fault(&mut self, op: BrokerOp) -> Result<()> {
        if let Some(pos) = self.faults.iter().position(|f| *f == op) {
            self.faults.remove(pos);
            return Err(ColdVaultError::service(op.name(), "injected failure"));
        }
        Ok(())
    }

    fn topic_exists(&self, topic: &TopicArn) -> bool {
        self.topics.values().any(|t| t == topic)
    }
}

pub struct InMemoryBroker {
    region: String,
    ids: IdGenerator,
    clock: Arc<dyn Clock>,
    state: Mutex<BrokerState>,
    receive_calls: AtomicU64,
}

impl InMemoryBroker {
    pub fn new(region: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            region: region.into(),
            ids: IdGenerator::new(clock.clone()),
            clock,
            state: Mutex::new(BrokerState::default()),
            receive_calls: AtomicU64::new(0),
        }
    }

    /// Make the next call of `op` fail with a service error.
    pub async fn fail_next(&self, op: BrokerOp) {
        self.state.lock().await.faults.push(op);
    }

    /// Publish `payload` on `topic`, wrapped in a delivery envelope.
    ///
    /// Returns the number of queues that accepted the message.
    pub async fn publish(&self, topic: &TopicArn, payload: &str) -> Result<usize> {
        let mut state = self.state.lock().await;
        if !state.topic_exists(topic) {
            return Err(ColdVaultError::not_found("topic", topic.as_str()));
        }

        let endpoints: Vec<QueueArn> = state
            .subscriptions
            .values()
            .filter(|s| &s.topic == topic)
            .map(|s| s.endpoint.clone())
            .collect();

        let mut delivered = 0;
        for endpoint in endpoints {
            let message_id = self.ids.ulid().to_string();
            let envelope = DeliveryEnvelope {
                kind: Some("Notification".to_string()),
                message_id: Some(message_id.clone()),
                topic_arn: Some(topic.clone()),
                timestamp: Some(self.clock.now().to_rfc3339()),
                message: payload.to_string(),
            };
            let body = serde_json::to_string(&envelope)?;

            let Some(queue) = state.queues.values_mut().find(|q| q.arn == endpoint) else {
                tracing::debug!(queue = %endpoint, "subscribed queue no longer exists");
                continue;
            };
            let allowed = queue
                .policy
                .as_ref()
                .is_some_and(|p| p.permits(&endpoint, topic));
            if !allowed {
                tracing::debug!(queue = %endpoint, topic = %topic, "delivery refused by queue policy");
                continue;
            }
            queue.messages.push_back(Message { message_id, body });
            delivered += 1;
        }
        Ok(delivered)
    }

    pub async fn queue_count(&self) -> usize {
        self.state.lock().await.queues.len()
    }

    pub async fn topic_count(&self) -> usize {
        self.state.lock().await.topics.len()
    }

    pub async fn subscription_count(&self) -> usize {
        self.state.lock().await.subscriptions.len()
    }

    pub fn receive_calls(&self) -> u64 {
        self.receive_calls.load(Ordering::Relaxed)
    }

    fn arn(&self, service: &str, name: &str) -> String {
        format!("arn:coldvault:{service}:{}:local:{name}", self.region)
    }
}

#[async_trait]
impl QueueClient for InMemoryBroker {
    async fn create_queue(&self, name: &str) -> Result<QueueUrl> {
        let mut state = self.state.lock().await;
        state.take_fault(BrokerOp::CreateQueue)?;
        if let Some(existing) = state.queues_by_name.get(name) {
            return Ok(existing.clone());
        }

        let url = QueueUrl::new(format!("https://sqs.{}.local/queues/{name}", self.region));
        let record = QueueRecord {
            arn: QueueArn::new(self.arn("sqs", name)),
            policy: None,
            messages: VecDeque::new(),
        };
        state.queues.insert(url.clone(), record);
        state.queues_by_name.insert(name.to_string(), url.clone());
        Ok(url)
    }

    async fn queue_arn(&self, queue: &QueueUrl) -> Result<QueueArn> {
        let mut state = self.state.lock().await;
        state.take_fault(BrokerOp::QueueArn)?;
        state
            .queues
            .get(queue)
            .map(|q| q.arn.clone())
            .ok_or_else(|| ColdVaultError::not_found("queue", queue.as_str()))
    }

    async fn set_access_policy(&self, queue: &QueueUrl, policy: &QueuePolicy) -> Result<()> {
        let mut state = self.state.lock().await;
        state.take_fault(BrokerOp::SetAccessPolicy)?;
        let record = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| ColdVaultError::not_found("queue", queue.as_str()))?;
        record.policy = Some(policy.clone());
        Ok(())
    }

    async fn receive_messages(&self, queue: &QueueUrl, max_batch: usize) -> Result<Vec<Message>> {
        self.receive_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock().await;
        state.take_fault(BrokerOp::ReceiveMessages)?;
        let record = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| ColdVaultError::not_found("queue", queue.as_str()))?;
        let n = max_batch.min(record.messages.len());
        Ok(record.messages.drain(..n).collect())
    }

    async fn delete_queue(&self, queue: &QueueUrl) -> Result<()> {
        let mut state = self.state.lock().await;
        state.take_fault(BrokerOp::DeleteQueue)?;
        if state.queues.remove(queue).is_none() {
            return Err(ColdVaultError::not_found("queue", queue.as_str()));
        }
        state.queues_by_name.retain(|_, url| url != queue);
        Ok(())
    }
}

#[async_trait]
impl NotificationClient for InMemoryBroker {
    async fn create_topic(&self, name: &str) -> Result<TopicArn> {
        let mut state = self.state.lock().await;
        state.take_fault(BrokerOp::CreateTopic)?;
        let arn = TopicArn::new(self.arn("sns", name));
        Ok(state.topics.entry(name.to_string()).or_insert(arn).clone())
    }

    async fn subscribe(
        &self,
        topic: &TopicArn,
        endpoint: &QueueArn,
        protocol: Protocol,
    ) -> Result<SubscriptionArn> {
        let mut state = self.state.lock().await;
        state.take_fault(BrokerOp::Subscribe)?;
        if !state.topic_exists(topic) {
            return Err(ColdVaultError::not_found("topic", topic.as_str()));
        }

        let arn = SubscriptionArn::new(format!("{topic}:{protocol}:{}", self.ids.ulid()));
        state.subscriptions.insert(
            arn.clone(),
            SubscriptionRecord {
                topic: topic.clone(),
                endpoint: endpoint.clone(),
            },
        );
        Ok(arn)
    }

    async fn unsubscribe(&self, subscription: &SubscriptionArn) -> Result<()> {
        let mut state = self.state.lock().await;
        state.take_fault(BrokerOp::Unsubscribe)?;
        state
            .subscriptions
            .remove(subscription)
            .map(|_| ())
            .ok_or_else(|| ColdVaultError::not_found("subscription", subscription.as_str()))
    }

    async fn delete_topic(&self, topic: &TopicArn) -> Result<()> {
        let mut state = self.state.lock().await;
        state.take_fault(BrokerOp::DeleteTopic)?;
        if !state.topic_exists(topic) {
            return Err(ColdVaultError::not_found("topic", topic.as_str()));
        }
        state.topics.retain(|_, arn| arn != topic);
        state.subscriptions.retain(|_, s| &s.topic != topic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobNotification;
    use crate::ports::SystemClock;

    fn broker() -> InMemoryBroker {
        InMemoryBroker::new("us-east-1", Arc::new(SystemClock))
    }

    async fn wired(broker: &InMemoryBroker) -> (QueueUrl, TopicArn) {
        let url = broker.create_queue("q").await.unwrap();
        let queue_arn = broker.queue_arn(&url).await.unwrap();
        let topic = broker.create_topic("t").await.unwrap();
        broker.subscribe(&topic, &queue_arn, Protocol::Queue).await.unwrap();
        broker
            .set_access_policy(&url, &QueuePolicy::allow_topic(&queue_arn, &topic))
            .await
            .unwrap();
        (url, topic)
    }

    #[tokio::test]
    async fn publish_wraps_payload_for_subscribed_queue() {
        let broker = broker();
        let (url, topic) = wired(&broker).await;

        let delivered = broker
            .publish(&topic, r#"{"JobId":"j1","StatusCode":"Succeeded"}"#)
            .await
            .unwrap();
        assert_eq!(delivered, 1);

        let msgs = broker.receive_messages(&url, 10).await.unwrap();
        assert_eq!(msgs.len(), 1);
        let n = JobNotification::parse(&msgs[0].body).unwrap();
        assert_eq!(n.job_id.as_str(), "j1");

        // drained
        assert!(broker.receive_messages(&url, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivery_without_policy_is_dropped() {
        let broker = broker();
        let url = broker.create_queue("q").await.unwrap();
        let queue_arn = broker.queue_arn(&url).await.unwrap();
        let topic = broker.create_topic("t").await.unwrap();
        broker.subscribe(&topic, &queue_arn, Protocol::Queue).await.unwrap();

        assert_eq!(broker.publish(&topic, "{}").await.unwrap(), 0);
        assert!(broker.receive_messages(&url, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_is_idempotent_by_name() {
        let broker = broker();
        let a = broker.create_queue("q").await.unwrap();
        let b = broker.create_queue("q").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(broker.queue_count().await, 1);

        let t1 = broker.create_topic("t").await.unwrap();
        let t2 = broker.create_topic("t").await.unwrap();
        assert_eq!(t1, t2);
        assert_eq!(broker.topic_count().await, 1);
    }

    #[tokio::test]
    async fn delete_topic_drops_its_subscriptions() {
        let broker = broker();
        let (url, topic) = wired(&broker).await;
        assert_eq!(broker.subscription_count().await, 1);

        broker.delete_topic(&topic).await.unwrap();
        assert_eq!(broker.subscription_count().await, 0);
        assert!(broker.delete_topic(&topic).await.unwrap_err().is_not_found());

        broker.delete_queue(&url).await.unwrap();
        assert!(broker.delete_queue(&url).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn injected_fault_fails_exactly_once() {
        let broker = broker();
        broker.fail_next(BrokerOp::CreateQueue).await;

        let err = broker.create_queue("q").await.unwrap_err();
        assert_eq!(err.to_string(), "create_queue failed: injected failure");
        assert!(broker.create_queue("q").await.is_ok());
    }
}
