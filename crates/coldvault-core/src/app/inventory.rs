//! InventoryCoordinator - lists a vault through an asynchronous job.
//!
//! # Flow
//! 1. Provisioning: queue, topic, subscription, queue policy
//! 2. JobRunning: initiate the inventory job on the topic
//! 3. Polling: receive, unwrap, match the job id; back off when empty
//! 4. Completed: stream the job output into `<vault>-inventory`
//! 5. CleaningUp: unsubscribe, delete topic, delete queue (always)
//!
//! Any failure before cleanup ends in `Failed`, but cleanup still runs.
//! A transient polling failure is logged and counts as an empty poll.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::channel::{CleanupReport, EphemeralChannel};
use super::context::ServiceContext;
use crate::domain::{InventoryJob, InventoryPhase, JobId, JobNotification, QueueUrl};
use crate::error::{ColdVaultError, ErrorKind, Result};
use crate::ports::{IdGenerator, NotificationClient, QueueClient, StorageClient};

/// Messages requested per poll.
const MAX_BATCH: usize = 10;

/// Result of a finished inventory run.
#[derive(Debug)]
pub struct InventoryReport {
    pub job_id: JobId,
    pub output_path: PathBuf,
    pub polls: u64,
    /// Phases in the order they were entered.
    pub phases: Vec<InventoryPhase>,
    pub cleanup: CleanupReport,
}

/// A run that ended in `Failed`, after cleanup.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct InventoryFailure {
    pub error: ColdVaultError,
    /// Phases in the order they were entered, ending with `Failed`.
    pub phases: Vec<InventoryPhase>,
    pub cleanup: CleanupReport,
}

pub struct InventoryCoordinator {
    storage: Arc<dyn StorageClient>,
    queues: Arc<dyn QueueClient>,
    notifications: Arc<dyn NotificationClient>,
    ids: IdGenerator,
    channel_prefix: String,
    output_dir: PathBuf,
    poll_interval: Duration,
    max_wait: Option<Duration>,
}

impl InventoryCoordinator {
    pub fn new(ctx: &ServiceContext) -> Self {
        Self {
            storage: ctx.storage.clone(),
            queues: ctx.queues.clone(),
            notifications: ctx.notifications.clone(),
            ids: IdGenerator::new(ctx.clock.clone()),
            channel_prefix: ctx.settings.channel_prefix.clone(),
            output_dir: ctx.settings.inventory_dir.clone(),
            poll_interval: ctx.settings.poll_interval(),
            max_wait: ctx.settings.max_wait(),
        }
    }

    /// Run the whole workflow for `vault`.
    ///
    /// `cancel` aborts the wait between polls as soon as it reads `true`.
    /// The ephemeral channel is torn down on every path.
    pub async fn run(
        &self,
        vault: &str,
        mut cancel: watch::Receiver<bool>,
    ) -> std::result::Result<InventoryReport, InventoryFailure> {
        let mut channel = EphemeralChannel::default();
        let mut phases = vec![InventoryPhase::Provisioning];

        let outcome = self.drive(vault, &mut channel, &mut phases, &mut cancel).await;

        phases.push(InventoryPhase::CleaningUp);
        info!(vault, "Unsubscribing from created services");
        let cleanup = channel
            .teardown(self.queues.as_ref(), self.notifications.as_ref())
            .await;

        match outcome {
            Ok((job, output_path)) => {
                phases.push(InventoryPhase::Done);
                Ok(InventoryReport {
                    job_id: job.job_id,
                    output_path,
                    polls: job.polls,
                    phases,
                    cleanup,
                })
            }
            Err(error) => {
                phases.push(InventoryPhase::Failed);
                error!(
                    vault,
                    error = %error,
                    cleanup_failures = cleanup.failures.len(),
                    "Inventory retrieval failed"
                );
                Err(InventoryFailure {
                    error,
                    phases,
                    cleanup,
                })
            }
        }
    }

    async fn drive(
        &self,
        vault: &str,
        channel: &mut EphemeralChannel,
        phases: &mut Vec<InventoryPhase>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(InventoryJob, PathBuf)> {
        let name = self.ids.unique_name(&self.channel_prefix);
        let (queue, topic) = channel
            .provision(self.queues.as_ref(), self.notifications.as_ref(), &name)
            .await?;

        phases.push(InventoryPhase::JobRunning);
        let job_id = self.storage.initiate_inventory_job(vault, &topic).await?;
        let mut job = InventoryJob::new(job_id, vault);
        info!(vault, job_id = %job.job_id, "Job has initiated");

        phases.push(InventoryPhase::Polling);
        let notification = self.wait_for_job(&mut job, &queue, cancel).await?;
        if !job.succeeded() {
            return Err(ColdVaultError::JobFailed {
                job_id: job.job_id.to_string(),
                status: notification
                    .status_message
                    .map(|m| format!("{} ({m})", notification.status.as_code()))
                    .unwrap_or_else(|| notification.status.as_code().to_string()),
            });
        }

        phases.push(InventoryPhase::Completed);
        let path = self.download_output(&job).await?;
        Ok((job, path))
    }

    /// Poll `queue` until the notification for `job` shows up.
    ///
    /// Messages for other jobs and malformed messages are skipped. An empty
    /// poll waits `poll_interval` (never less), bounded by `max_wait` if set.
    /// A transient receive failure is treated like an empty poll.
    async fn wait_for_job(
        &self,
        job: &mut InventoryJob,
        queue: &QueueUrl,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<JobNotification> {
        let deadline = self.max_wait.map(|d| Instant::now() + d);

        loop {
            if *cancel.borrow() {
                return Err(ColdVaultError::Cancelled(job.job_id.to_string()));
            }

            job.record_poll();
            let messages = match self.queues.receive_messages(queue, MAX_BATCH).await {
                Ok(messages) => messages,
                Err(e) if e.kind() == ErrorKind::Transient => {
                    warn!(job_id = %job.job_id, error = %e, "Polling failed, retrying after the backoff");
                    Vec::new()
                }
                Err(e) => return Err(e),
            };

            if messages.is_empty() {
                let now = Instant::now();
                if let Some(deadline) = deadline
                    && now >= deadline
                {
                    return Err(ColdVaultError::DeadlineExceeded(job.job_id.to_string()));
                }
                let wake = match deadline {
                    Some(deadline) => deadline.min(now + self.poll_interval),
                    None => now + self.poll_interval,
                };
                info!(
                    job_id = %job.job_id,
                    polls = job.polls,
                    "Waiting for another {} minutes",
                    (wake - now).as_secs() / 60
                );
                tokio::select! {
                    _ = tokio::time::sleep_until(wake) => {}
                    _ = cancelled(cancel) => {
                        return Err(ColdVaultError::Cancelled(job.job_id.to_string()));
                    }
                }
                continue;
            }

            for message in messages {
                let notification = match JobNotification::parse(&message.body) {
                    Ok(n) => n,
                    Err(e) => {
                        warn!(message_id = %message.message_id, error = %e, "Skipping message");
                        continue;
                    }
                };
                if !notification.is_for(&job.job_id) {
                    debug!(
                        job_id = %job.job_id,
                        other = %notification.job_id,
                        "Ignoring notification for another job"
                    );
                    continue;
                }
                info!(
                    job_id = %job.job_id,
                    status = notification.status.as_code(),
                    elapsed_secs = job.started_at.elapsed().as_secs(),
                    "Job finished"
                );
                job.finish(notification.status.clone());
                return Ok(notification);
            }
        }
    }

    /// Write the job output line by line to `<output_dir>/<vault>-inventory`.
    async fn download_output(&self, job: &InventoryJob) -> Result<PathBuf> {
        let path = job.output_path(&self.output_dir);
        info!(vault = %job.vault_name, path = %path.display(), "Downloading inventory");

        let output = self
            .storage
            .fetch_job_output(&job.vault_name, &job.job_id)
            .await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let mut out = BufWriter::new(tokio::fs::File::create(&path).await?);
        let mut lines = BufReader::new(output).lines();
        while let Some(line) = lines.next_line().await? {
            out.write_all(line.as_bytes()).await?;
            out.write_all(b"\n").await?;
        }
        out.flush().await?;

        info!(vault = %job.vault_name, path = %path.display(), "Retrieved inventory");
        Ok(path)
    }
}

/// Resolves once `rx` reads `true`. Never resolves if the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
