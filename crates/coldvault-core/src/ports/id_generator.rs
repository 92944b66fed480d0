//! IdGenerator - ULID based identifiers for names and service-side ids.
//!
//! ULIDs sort by creation time and need no coordination, so two CLI
//! invocations running at the same time never pick the same ephemeral
//! queue or topic name.

use std::sync::Arc;

use ulid::Ulid;

use crate::ports::Clock;

#[derive(Clone)]
pub struct IdGenerator {
    clock: Arc<dyn Clock>,
}

impl IdGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }

    /// `<prefix>-<ulid>`, usable as a queue or topic name.
    pub fn unique_name(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.ulid())
    }
}
