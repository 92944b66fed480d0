//! Queue access policy granting a topic permission to deliver messages.
//!
//! Without this policy the subscription is created fine but every delivery
//! is silently dropped by the queue.

use serde::Serialize;

use super::ids::{QueueArn, TopicArn};

const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueuePolicy {
    version: &'static str,
    statement: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Statement {
    sid: String,
    effect: &'static str,
    principal: serde_json::Value,
    action: &'static str,
    resource: String,
    condition: serde_json::Value,
}

impl QueuePolicy {
    /// Allow `topic` (and only `topic`) to send messages to `queue`.
    pub fn allow_topic(queue: &QueueArn, topic: &TopicArn) -> Self {
        Self {
            version: POLICY_VERSION,
            statement: vec![Statement {
                sid: "AllowTopicDelivery".to_string(),
                effect: "Allow",
                principal: serde_json::json!({ "AWS": "*" }),
                action: "sqs:SendMessage",
                resource: queue.to_string(),
                condition: serde_json::json!({
                    "ArnEquals": { "aws:SourceArn": topic.as_str() }
                }),
            }],
        }
    }

    /// Whether this policy lets `topic` deliver into `queue`.
    pub fn permits(&self, queue: &QueueArn, topic: &TopicArn) -> bool {
        self.statement.iter().any(|s| {
            s.effect == "Allow"
                && s.action == "sqs:SendMessage"
                && s.resource == queue.as_str()
                && s.condition["ArnEquals"]["aws:SourceArn"] == topic.as_str()
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_iam_style_document() {
        let queue = QueueArn::new("arn:local:sqs:us-east-1:q");
        let topic = TopicArn::new("arn:local:sns:us-east-1:t");
        let policy = QueuePolicy::allow_topic(&queue, &topic);

        let doc: serde_json::Value = serde_json::from_str(&policy.to_json()).unwrap();
        assert_eq!(doc["Version"], "2012-10-17");
        assert_eq!(doc["Statement"][0]["Action"], "sqs:SendMessage");
        assert_eq!(doc["Statement"][0]["Resource"], queue.as_str());
        assert_eq!(
            doc["Statement"][0]["Condition"]["ArnEquals"]["aws:SourceArn"],
            topic.as_str()
        );
    }

    #[test]
    fn permits_only_the_paired_topic() {
        let queue = QueueArn::new("q");
        let topic = TopicArn::new("t");
        let policy = QueuePolicy::allow_topic(&queue, &topic);

        assert!(policy.permits(&queue, &topic));
        assert!(!policy.permits(&queue, &TopicArn::new("other")));
        assert!(!policy.permits(&QueueArn::new("other"), &topic));
    }
}
