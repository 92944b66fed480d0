//! coldvault-core
//!
//! Archival storage operations against a cold-storage service, including
//! vault inventories that complete asynchronously and are observed through
//! a per-run notification topic and queue.
//!
//! # Modules
//! - **domain**: ids, vault descriptions, jobs, notifications, operations
//! - **ports**: service contracts (StorageClient, QueueClient, NotificationClient, Clock)
//! - **app**: coordinator, dispatcher, service context
//! - **impls**: local backend (filesystem storage, in-process broker)
//! - **config**: TOML settings
//! - **error**: error type and kinds

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;

pub use app::{DispatchOutcome, OperationDispatcher, ServiceContext};
pub use config::Settings;
pub use domain::Operation;
pub use error::{ColdVaultError, ErrorKind, Result};
