//! LocalStorage - filesystem-backed cold storage.
//!
//! Layout under `<root>/<region>/`:
//!
//! ```text
//! <vault>/vault.json            vault metadata
//! <vault>/archives/<id>.data    archive bytes
//! <vault>/archives/<id>.json    archive metadata
//! ```
//!
//! Inventory jobs complete immediately: the inventory document is built at
//! initiation, kept in memory until its output is fetched, and the
//! completion notification is published on the job's topic through the
//! [`InMemoryBroker`].

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::memory_broker::InMemoryBroker;
use crate::domain::{ArchiveId, JobId, JobStatusPayload, TopicArn, VaultArn, VaultDescription};
use crate::error::{ColdVaultError, Result};
use crate::ports::{Clock, IdGenerator, JobOutput, StorageClient};

const VAULT_FILE: &str = "vault.json";
const ARCHIVES_DIR: &str = "archives";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultMeta {
    name: String,
    arn: VaultArn,
    created_at: DateTime<Utc>,
    #[serde(default)]
    last_inventory_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArchiveEntry {
    archive_id: ArchiveId,
    archive_description: String,
    creation_date: DateTime<Utc>,
    size: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InventoryDocument {
    #[serde(rename = "VaultARN")]
    vault_arn: VaultArn,
    inventory_date: DateTime<Utc>,
    archive_list: Vec<ArchiveEntry>,
}

struct FinishedJob {
    vault: String,
    output: Vec<u8>,
}

pub struct LocalStorage {
    root: PathBuf,
    region: String,
    broker: Arc<InMemoryBroker>,
    clock: Arc<dyn Clock>,
    ids: IdGenerator,
    jobs: Mutex<HashMap<JobId, FinishedJob>>,
}

impl LocalStorage {
    pub fn new(
        root: impl Into<PathBuf>,
        region: impl Into<String>,
        broker: Arc<InMemoryBroker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let region = region.into();
        Self {
            root: root.into().join(&region),
            region,
            broker,
            ids: IdGenerator::new(clock.clone()),
            clock,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn vault_dir(&self, name: &str) -> Result<PathBuf> {
        validate_vault_name(name)?;
        Ok(self.root.join(name))
    }

    fn archive_paths(&self, vault: &str, archive: &ArchiveId) -> Result<(PathBuf, PathBuf)> {
        let id = archive.as_str();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(ColdVaultError::not_found("archive", id));
        }
        let dir = self.vault_dir(vault)?.join(ARCHIVES_DIR);
        Ok((dir.join(format!("{id}.data")), dir.join(format!("{id}.json"))))
    }

    async fn read_meta(&self, name: &str) -> Result<VaultMeta> {
        let path = self.vault_dir(name)?.join(VAULT_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ColdVaultError::not_found("vault", name))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_meta(&self, meta: &VaultMeta) -> Result<()> {
        let path = self.vault_dir(&meta.name)?.join(VAULT_FILE);
        tokio::fs::write(path, serde_json::to_vec_pretty(meta)?).await?;
        Ok(())
    }

    async fn list_archives(&self, vault: &str) -> Result<Vec<ArchiveEntry>> {
        let dir = self.vault_dir(vault)?.join(ARCHIVES_DIR);
        let mut entries = Vec::new();
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let bytes = tokio::fs::read(&path).await?;
                entries.push(serde_json::from_slice::<ArchiveEntry>(&bytes)?);
            }
        }
        entries.sort_by(|a, b| a.creation_date.cmp(&b.creation_date));
        Ok(entries)
    }
}

/// Vault names: 1-255 characters from `a-z A-Z 0-9 _ - .`
fn validate_vault_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 255
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ColdVaultError::service(
            "validate_vault_name",
            format!("invalid vault name {name:?}"),
        ))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn create_vault(&self, name: &str) -> Result<VaultArn> {
        match self.read_meta(name).await {
            Ok(meta) => return Ok(meta.arn),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        tokio::fs::create_dir_all(self.vault_dir(name)?.join(ARCHIVES_DIR)).await?;
        let meta = VaultMeta {
            name: name.to_string(),
            arn: VaultArn::new(format!(
                "arn:coldvault:glacier:{}:local:vaults/{name}",
                self.region
            )),
            created_at: self.clock.now(),
            last_inventory_at: None,
        };
        self.write_meta(&meta).await?;
        Ok(meta.arn)
    }

    async fn delete_vault(&self, name: &str) -> Result<()> {
        self.read_meta(name).await?;
        if !self.list_archives(name).await?.is_empty() {
            return Err(ColdVaultError::service(
                "delete_vault",
                format!("vault {name} is not empty"),
            ));
        }
        tokio::fs::remove_dir_all(self.vault_dir(name)?).await?;
        Ok(())
    }

    async fn describe_vault(&self, name: &str) -> Result<VaultDescription> {
        let meta = self.read_meta(name).await?;
        let archives = self.list_archives(name).await?;
        Ok(VaultDescription {
            vault_name: meta.name,
            vault_arn: meta.arn,
            creation_date: meta.created_at,
            last_inventory_date: meta.last_inventory_at,
            number_of_archives: archives.len() as u64,
            size_in_bytes: archives.iter().map(|a| a.size).sum(),
        })
    }

    async fn upload_archive(
        &self,
        vault: &str,
        description: &str,
        local_path: &Path,
    ) -> Result<ArchiveId> {
        self.read_meta(vault).await?;
        let archive = ArchiveId::new(self.ids.ulid().to_string());
        let (data_path, meta_path) = self.archive_paths(vault, &archive)?;

        let size = tokio::fs::copy(local_path, &data_path).await?;
        let entry = ArchiveEntry {
            archive_id: archive.clone(),
            archive_description: description.to_string(),
            creation_date: self.clock.now(),
            size,
        };
        tokio::fs::write(&meta_path, serde_json::to_vec_pretty(&entry)?).await?;
        Ok(archive)
    }

    async fn download_archive(
        &self,
        vault: &str,
        archive: &ArchiveId,
        dest: &Path,
    ) -> Result<()> {
        self.read_meta(vault).await?;
        let (data_path, _) = self.archive_paths(vault, archive)?;
        if !tokio::fs::try_exists(&data_path).await? {
            return Err(ColdVaultError::not_found("archive", archive.as_str()));
        }
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&data_path, dest).await?;
        Ok(())
    }

    async fn delete_archive(&self, vault: &str, archive: &ArchiveId) -> Result<()> {
        self.read_meta(vault).await?;
        let (data_path, meta_path) = self.archive_paths(vault, archive)?;
        if !tokio::fs::try_exists(&meta_path).await? {
            return Err(ColdVaultError::not_found("archive", archive.as_str()));
        }
        tokio::fs::remove_file(&meta_path).await?;
        tokio::fs::remove_file(&data_path).await?;
        Ok(())
    }

    async fn initiate_inventory_job(&self, vault: &str, topic: &TopicArn) -> Result<JobId> {
        let mut meta = self.read_meta(vault).await?;
        let now = self.clock.now();
        let document = InventoryDocument {
            vault_arn: meta.arn.clone(),
            inventory_date: now,
            archive_list: self.list_archives(vault).await?,
        };
        let output = serde_json::to_vec_pretty(&document)?;

        let job_id = JobId::new(self.ids.ulid().to_string());
        meta.last_inventory_at = Some(now);
        self.write_meta(&meta).await?;

        let payload = JobStatusPayload {
            job_id: job_id.clone(),
            status_code: "Succeeded".to_string(),
            action: Some("InventoryRetrieval".to_string()),
            vault_arn: Some(meta.arn.to_string()),
            status_message: None,
            completed: Some(true),
        };
        self.broker
            .publish(topic, &serde_json::to_string(&payload)?)
            .await
            .map_err(|e| ColdVaultError::service("initiate_inventory_job", e.to_string()))?;

        self.jobs.lock().await.insert(
            job_id.clone(),
            FinishedJob {
                vault: vault.to_string(),
                output,
            },
        );
        Ok(job_id)
    }

    async fn fetch_job_output(&self, vault: &str, job: &JobId) -> Result<JobOutput> {
        let mut jobs = self.jobs.lock().await;
        match jobs.get(job) {
            Some(finished) if finished.vault == vault => {}
            _ => return Err(ColdVaultError::not_found("job", job.as_str())),
        }
        let finished = jobs
            .remove(job)
            .ok_or_else(|| ColdVaultError::not_found("job", job.as_str()))?;
        Ok(Box::new(Cursor::new(finished.output)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueuePolicy;
    use crate::ports::{FixedClock, NotificationClient, Protocol, QueueClient};
    use chrono::TimeZone;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn setup(tmp: &TempDir) -> (LocalStorage, Arc<InMemoryBroker>) {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let broker = Arc::new(InMemoryBroker::new("us-east-1", clock.clone()));
        let storage = LocalStorage::new(tmp.path(), "us-east-1", broker.clone(), clock);
        (storage, broker)
    }

    #[tokio::test]
    async fn create_then_describe_returns_same_name() {
        let tmp = TempDir::new().unwrap();
        let (storage, _) = setup(&tmp);

        let arn = storage.create_vault("photos").await.unwrap();
        let desc = storage.describe_vault("photos").await.unwrap();
        assert_eq!(desc.vault_name, "photos");
        assert_eq!(desc.vault_arn, arn);
        assert_eq!(desc.number_of_archives, 0);
        assert!(tmp.path().join("us-east-1/photos/vault.json").exists());
    }

    #[tokio::test]
    async fn describe_missing_vault_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let (storage, _) = setup(&tmp);
        assert!(storage.describe_vault("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn invalid_vault_names_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let (storage, _) = setup(&tmp);
        for name in ["", "..", "a/b", "with space"] {
            assert!(storage.create_vault(name).await.is_err(), "{name:?}");
        }
    }

    #[tokio::test]
    async fn upload_download_delete_archive() {
        let tmp = TempDir::new().unwrap();
        let (storage, _) = setup(&tmp);
        storage.create_vault("photos").await.unwrap();

        let src = tmp.path().join("a.txt");
        tokio::fs::write(&src, b"hello").await.unwrap();
        let id = storage.upload_archive("photos", "a.txt-x", &src).await.unwrap();

        let desc = storage.describe_vault("photos").await.unwrap();
        assert_eq!(desc.number_of_archives, 1);
        assert_eq!(desc.size_in_bytes, 5);

        let dest = tmp.path().join("out").join(id.as_str());
        storage.download_archive("photos", &id, &dest).await.unwrap();
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello");

        storage.delete_archive("photos", &id).await.unwrap();
        assert!(storage.delete_archive("photos", &id).await.unwrap_err().is_not_found());
        assert!(storage
            .download_archive("photos", &id, &dest)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn non_empty_vault_cannot_be_deleted() {
        let tmp = TempDir::new().unwrap();
        let (storage, _) = setup(&tmp);
        storage.create_vault("photos").await.unwrap();
        let src = tmp.path().join("a.txt");
        tokio::fs::write(&src, b"x").await.unwrap();
        storage.upload_archive("photos", "a", &src).await.unwrap();

        let err = storage.delete_vault("photos").await.unwrap_err();
        assert!(err.to_string().contains("not empty"));
    }

    #[tokio::test]
    async fn deleting_twice_reports_not_found() {
        let tmp = TempDir::new().unwrap();
        let (storage, _) = setup(&tmp);
        storage.create_vault("photos").await.unwrap();

        storage.delete_vault("photos").await.unwrap();
        assert!(storage.delete_vault("photos").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn inventory_job_notifies_topic_and_output_is_consumed_once() {
        let tmp = TempDir::new().unwrap();
        let (storage, broker) = setup(&tmp);
        storage.create_vault("photos").await.unwrap();

        let url = broker.create_queue("q").await.unwrap();
        let queue_arn = broker.queue_arn(&url).await.unwrap();
        let topic = broker.create_topic("t").await.unwrap();
        broker.subscribe(&topic, &queue_arn, Protocol::Queue).await.unwrap();
        broker
            .set_access_policy(&url, &QueuePolicy::allow_topic(&queue_arn, &topic))
            .await
            .unwrap();

        let job = storage.initiate_inventory_job("photos", &topic).await.unwrap();
        assert_eq!(broker.receive_messages(&url, 10).await.unwrap().len(), 1);

        let mut out = String::new();
        storage
            .fetch_job_output("photos", &job)
            .await
            .unwrap()
            .read_to_string(&mut out)
            .await
            .unwrap();
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["ArchiveList"].as_array().unwrap().len(), 0);

        assert!(storage.fetch_job_output("photos", &job).await.is_err());
        let desc = storage.describe_vault("photos").await.unwrap();
        assert!(desc.last_inventory_date.is_some());
    }

    #[tokio::test]
    async fn failed_publish_leaves_no_pending_job() {
        let tmp = TempDir::new().unwrap();
        let (storage, _) = setup(&tmp);
        storage.create_vault("photos").await.unwrap();

        let missing = TopicArn::new("arn:coldvault:sns:us-east-1:local:gone");
        let err = storage
            .initiate_inventory_job("photos", &missing)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ColdVaultError::Service { operation: "initiate_inventory_job", .. }
        ));
        assert!(storage.jobs.lock().await.is_empty());
    }
}
