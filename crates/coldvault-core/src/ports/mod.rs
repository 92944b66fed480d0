//! Ports - the external services the tool depends on.
//!
//! Each trait is a capability contract; the crate never assumes a concrete
//! service. `impls` provides the local backend.

pub mod clock;
pub mod id_generator;
pub mod notification;
pub mod queue;
pub mod storage;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::IdGenerator;
pub use self::notification::{NotificationClient, Protocol};
pub use self::queue::{Message, QueueClient};
pub use self::storage::{JobOutput, StorageClient};
