//! StorageClient port - vaults, archives and asynchronous jobs.

use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::domain::{ArchiveId, JobId, TopicArn, VaultArn, VaultDescription};
use crate::error::Result;

/// Byte stream of a finished job's output.
pub type JobOutput = Box<dyn AsyncRead + Send + Unpin>;

/// Cold-storage service.
///
/// Every call is a billable remote operation. Only `describe_vault` and the
/// deletes are safe to repeat; a delete of something already gone returns
/// a `NotFound` error that callers report rather than treat as fatal.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn create_vault(&self, name: &str) -> Result<VaultArn>;

    async fn delete_vault(&self, name: &str) -> Result<()>;

    async fn describe_vault(&self, name: &str) -> Result<VaultDescription>;

    /// Single-shot upload of `local_path`, stored under `description`.
    async fn upload_archive(
        &self,
        vault: &str,
        description: &str,
        local_path: &Path,
    ) -> Result<ArchiveId>;

    async fn download_archive(&self, vault: &str, archive: &ArchiveId, dest: &Path)
    -> Result<()>;

    async fn delete_archive(&self, vault: &str, archive: &ArchiveId) -> Result<()>;

    /// Start an inventory retrieval; completion is announced on `topic`.
    async fn initiate_inventory_job(&self, vault: &str, topic: &TopicArn) -> Result<JobId>;

    async fn fetch_job_output(&self, vault: &str, job: &JobId) -> Result<JobOutput>;
}
