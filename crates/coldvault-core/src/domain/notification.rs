//! Job completion notifications.
//!
//! A notification reaches the queue wrapped twice: the topic delivers an
//! envelope whose `Message` field carries the job status document as a JSON
//! *string*, so the payload has to be parsed a second time.

use serde::{Deserialize, Serialize};

use super::ids::{JobId, TopicArn};
use crate::error::{ColdVaultError, Result};

/// Terminal status reported for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed,
    /// Any status code the service may add later; treated as a failure.
    Other(String),
}

impl JobStatus {
    pub fn from_code(code: &str) -> Self {
        match code {
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_code(&self) -> &str {
        match self {
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Other(code) => code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Outer envelope written by the topic into each subscribed queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeliveryEnvelope {
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_arn: Option<TopicArn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub message: String,
}

/// Inner job status document published by the storage service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobStatusPayload {
    pub job_id: JobId,
    pub status_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(rename = "VaultARN", default, skip_serializing_if = "Option::is_none")]
    pub vault_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// A parsed notification, reduced to what the poller needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNotification {
    pub job_id: JobId,
    pub status: JobStatus,
    pub status_message: Option<String>,
}

impl JobNotification {
    /// Unwrap a raw queue message body (outer envelope, then inner payload).
    pub fn parse(body: &str) -> Result<Self> {
        let envelope: DeliveryEnvelope = serde_json::from_str(body)
            .map_err(|e| ColdVaultError::MalformedMessage(format!("outer envelope: {e}")))?;
        let payload: JobStatusPayload = serde_json::from_str(&envelope.message)
            .map_err(|e| ColdVaultError::MalformedMessage(format!("job status payload: {e}")))?;

        Ok(Self {
            job_id: payload.job_id,
            status: JobStatus::from_code(&payload.status_code),
            status_message: payload.status_message,
        })
    }

    pub fn is_for(&self, job_id: &JobId) -> bool {
        &self.job_id == job_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn wrap(inner: &str) -> String {
        serde_json::json!({ "Type": "Notification", "Message": inner }).to_string()
    }

    #[test]
    fn parses_two_layer_envelope() {
        let body = wrap(r#"{"JobId":"X","StatusCode":"Succeeded"}"#);
        let n = JobNotification::parse(&body).unwrap();
        assert_eq!(n.job_id, JobId::new("X"));
        assert_eq!(n.status, JobStatus::Succeeded);
        assert!(n.is_for(&JobId::new("X")));
        assert!(!n.is_for(&JobId::new("Y")));
    }

    #[test]
    fn keeps_status_message_of_failed_jobs() {
        let body = wrap(
            r#"{"JobId":"X","StatusCode":"Failed","StatusMessage":"vault busy","Action":"InventoryRetrieval"}"#,
        );
        let n = JobNotification::parse(&body).unwrap();
        assert_eq!(n.status, JobStatus::Failed);
        assert_eq!(n.status_message.as_deref(), Some("vault busy"));
    }

    #[rstest]
    #[case::not_json("hello")]
    #[case::no_message_field(r#"{"Type":"Notification"}"#)]
    #[case::message_not_a_string(r#"{"Message":{"JobId":"X"}}"#)]
    #[case::inner_not_json(r#"{"Message":"not json"}"#)]
    #[case::inner_missing_status(r#"{"Message":"{\"JobId\":\"X\"}"}"#)]
    fn rejects_malformed_bodies(#[case] body: &str) {
        let err = JobNotification::parse(body).unwrap_err();
        assert!(matches!(err, ColdVaultError::MalformedMessage(_)));
    }

    #[rstest]
    #[case("Succeeded", JobStatus::Succeeded)]
    #[case("Failed", JobStatus::Failed)]
    #[case("InProgress", JobStatus::Other("InProgress".to_string()))]
    fn status_codes_map_to_statuses(#[case] code: &str, #[case] expected: JobStatus) {
        let status = JobStatus::from_code(code);
        assert_eq!(status.as_code(), code);
        assert_eq!(status, expected);
    }
}
