//! Impls - the local backend.
//!
//! - **InMemoryBroker**: queues and topics inside the process
//! - **LocalStorage**: vaults and archives on the filesystem, inventory jobs
//!   announced through the broker

pub mod local_storage;
pub mod memory_broker;

pub use self::local_storage::LocalStorage;
pub use self::memory_broker::{BrokerOp, InMemoryBroker};
