//! Error type shared by every layer of the crate.

use thiserror::Error;

/// Operational classification of a [`ColdVaultError`].
///
/// - Configuration: bad or missing config, aborts before any remote call
/// - Usage: missing CLI arguments
/// - NotFound: vault/archive/job does not exist (reported, never fatal)
/// - Transient: a remote call failed; the operator may simply retry
/// - MalformedMessage: a queue message did not parse as a job notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Usage,
    NotFound,
    Transient,
    MalformedMessage,
}

#[derive(Debug, Error)]
pub enum ColdVaultError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("usage error: {0}")]
    Usage(String),

    #[error("{resource} {name} was not found")]
    NotFound { resource: &'static str, name: String },

    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    #[error("malformed notification: {0}")]
    MalformedMessage(String),

    #[error("job {job_id} finished with status {status}")]
    JobFailed { job_id: String, status: String },

    #[error("wait for job {0} was cancelled")]
    Cancelled(String),

    #[error("gave up waiting for job {0}")]
    DeadlineExceeded(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ColdVaultError {
    pub fn not_found(resource: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            name: name.into(),
        }
    }

    pub fn service(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            operation,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Usage(_) => ErrorKind::Usage,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MalformedMessage(_) | Self::Json(_) => ErrorKind::MalformedMessage,
            Self::Service { .. }
            | Self::JobFailed { .. }
            | Self::Cancelled(_)
            | Self::DeadlineExceeded(_)
            | Self::Io(_) => ErrorKind::Transient,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

pub type Result<T> = std::result::Result<T, ColdVaultError>;
