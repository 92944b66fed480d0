//! ServiceContext - everything an operation needs, built once per run.

use std::sync::Arc;

use crate::config::Settings;
use crate::impls::{InMemoryBroker, LocalStorage};
use crate::ports::{Clock, NotificationClient, QueueClient, StorageClient, SystemClock};

/// Settings plus the three service clients.
///
/// Passed by reference into the dispatcher and the coordinator; there is no
/// process-wide client state.
#[derive(Clone)]
pub struct ServiceContext {
    pub settings: Settings,
    pub storage: Arc<dyn StorageClient>,
    pub queues: Arc<dyn QueueClient>,
    pub notifications: Arc<dyn NotificationClient>,
    pub clock: Arc<dyn Clock>,
}

impl ServiceContext {
    pub fn new(
        settings: Settings,
        storage: Arc<dyn StorageClient>,
        queues: Arc<dyn QueueClient>,
        notifications: Arc<dyn NotificationClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            storage,
            queues,
            notifications,
            clock,
        }
    }

    /// Wire the local backend: filesystem storage under
    /// `settings.storage_root` and an in-process broker.
    pub fn local(settings: Settings) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let broker = Arc::new(InMemoryBroker::new(settings.region.clone(), clock.clone()));
        let storage = Arc::new(LocalStorage::new(
            settings.storage_root.clone(),
            settings.region.clone(),
            broker.clone(),
            clock.clone(),
        ));
        Self::new(settings, storage, broker.clone(), broker, clock)
    }
}
