//! Domain model (ids, vaults, jobs, notifications, operations).

pub mod ids;
pub mod job;
pub mod notification;
pub mod operation;
pub mod policy;
pub mod vault;

pub use ids::{ArchiveId, JobId, QueueArn, QueueUrl, SubscriptionArn, TopicArn, VaultArn};
pub use job::{InventoryJob, InventoryPhase};
pub use notification::{DeliveryEnvelope, JobNotification, JobStatus, JobStatusPayload};
pub use operation::Operation;
pub use policy::QueuePolicy;
pub use vault::VaultDescription;
