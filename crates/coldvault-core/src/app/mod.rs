//! App - the workflows built on top of the ports.
//!
//! - **ServiceContext**: settings and clients, built once per run
//! - **EphemeralChannel**: per-job topic + queue provisioning and teardown
//! - **InventoryCoordinator**: the asynchronous inventory workflow
//! - **VaultOperations**: single-call vault and archive operations
//! - **OperationDispatcher**: operation token -> workflow

pub mod channel;
pub mod context;
pub mod dispatcher;
pub mod inventory;
pub mod operations;

pub use self::channel::{CleanupReport, EphemeralChannel};
pub use self::context::ServiceContext;
pub use self::dispatcher::{DispatchOutcome, OperationDispatcher};
pub use self::inventory::{InventoryCoordinator, InventoryFailure, InventoryReport};
pub use self::operations::VaultOperations;
