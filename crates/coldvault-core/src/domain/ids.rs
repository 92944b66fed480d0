//! Strongly-typed identifiers for remote resources.
//!
//! Every identifier handed out by a service is an opaque string, but a queue
//! URL and a topic ARN must never be swapped by accident. `ResourceId<T>`
//! wraps the string and uses a zero-sized marker `T` so each kind of
//! identifier is its own type while sharing one implementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Marker trait naming the kind of resource an identifier refers to.
pub trait ResourceKind: Send + Sync + 'static {
    /// Human readable label used in logs and errors (e.g. "queue url").
    fn label() -> &'static str;
}

#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId<T: ResourceKind> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: ResourceKind> ResourceId<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn label(&self) -> &'static str {
        T::label()
    }
}

// Manual impls: deriving would put bounds on T, which is never instantiated.
impl<T: ResourceKind> Clone for ResourceId<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T: ResourceKind> PartialEq for ResourceId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: ResourceKind> Eq for ResourceId<T> {}

impl<T: ResourceKind> std::hash::Hash for ResourceId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: ResourceKind> fmt::Debug for ResourceId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::label(), self.value)
    }
}

impl<T: ResourceKind> fmt::Display for ResourceId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T: ResourceKind> From<&str> for ResourceId<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: ResourceKind> From<String> for ResourceId<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

macro_rules! resource_kind {
    ($marker:ident, $alias:ident, $label:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $marker {}

        impl ResourceKind for $marker {
            fn label() -> &'static str {
                $label
            }
        }

        pub type $alias = ResourceId<$marker>;
    };
}

resource_kind!(Queue, QueueUrl, "queue url");
resource_kind!(QueueResource, QueueArn, "queue arn");
resource_kind!(Topic, TopicArn, "topic arn");
resource_kind!(Subscription, SubscriptionArn, "subscription arn");
resource_kind!(Job, JobId, "job");
resource_kind!(Archive, ArchiveId, "archive");
resource_kind!(VaultResource, VaultArn, "vault arn");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_compare_by_value_within_a_kind() {
        let a = JobId::new("job-1");
        let b: JobId = "job-1".into();
        assert_eq!(a, b);
        assert_ne!(a, JobId::new("job-2"));
    }

    #[test]
    fn debug_names_the_resource_kind() {
        let url = QueueUrl::new("https://queue.local/q1");
        assert_eq!(format!("{url:?}"), "queue url(https://queue.local/q1)");
        assert_eq!(url.to_string(), "https://queue.local/q1");
        assert_eq!(TopicArn::new("t").label(), "topic arn");
    }

    #[test]
    fn serializes_as_a_bare_string() {
        let id = ArchiveId::new("01HZX");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"01HZX\"");
        let back: ArchiveId = serde_json::from_str("\"01HZX\"").unwrap();
        assert_eq!(back, id);
    }
}
