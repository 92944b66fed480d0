//! Inventory job record and workflow phases.

use std::path::PathBuf;
use std::time::Instant;

use super::ids::JobId;
use super::notification::JobStatus;

/// Phase of one inventory-listing workflow.
///
/// Provisioning -> JobRunning -> Polling -> Completed -> CleaningUp -> Done.
/// `Failed` is reachable from every phase before cleanup, and cleanup runs
/// on that path as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryPhase {
    Provisioning,
    JobRunning,
    Polling,
    Completed,
    CleaningUp,
    Done,
    Failed,
}

/// One in-flight inventory request.
///
/// Design: state transitions go through methods so `updated_at` and the
/// terminal status stay consistent.
#[derive(Debug, Clone)]
pub struct InventoryJob {
    pub job_id: JobId,
    pub vault_name: String,
    /// Unknown until the completion notification arrives.
    pub status: Option<JobStatus>,
    pub started_at: Instant,
    pub updated_at: Instant,
    /// Number of queue polls performed so far.
    pub polls: u64,
}

impl InventoryJob {
    pub fn new(job_id: JobId, vault_name: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            job_id,
            vault_name: vault_name.into(),
            status: None,
            started_at: now,
            updated_at: now,
            polls: 0,
        }
    }

    pub fn record_poll(&mut self) {
        self.polls += 1;
        self.updated_at = Instant::now();
    }

    /// Record the terminal status. Only the first call has an effect.
    pub fn finish(&mut self, status: JobStatus) {
        if self.status.is_none() {
            self.status = Some(status);
            self.updated_at = Instant::now();
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status.as_ref().is_some_and(JobStatus::is_success)
    }

    /// File the inventory is written to: `<dir>/<vault>-inventory`.
    pub fn output_path(&self, dir: &std::path::Path) -> PathBuf {
        dir.join(format!("{}-inventory", self.vault_name))
    }
}
