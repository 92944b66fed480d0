//! Single-call vault and archive operations.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use super::context::ServiceContext;
use crate::domain::{ArchiveId, VaultDescription};
use crate::error::{ColdVaultError, Result};

/// Archive description for `file_name` uploaded at `at`.
///
/// The timestamp suffix keeps repeated uploads of the same file apart.
pub fn archive_description(file_name: &str, at: DateTime<Utc>) -> String {
    format!("{file_name}-{}", at.format("%Y%m%dT%H%M%SZ"))
}

pub struct VaultOperations<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> VaultOperations<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create_vault(&self, vault: &str) -> Result<VaultDescription> {
        info!(vault, "Creating vault");
        self.ctx.storage.create_vault(vault).await?;
        let description = self.ctx.storage.describe_vault(vault).await?;
        info!(vault, "Created vault successfully: {description}");
        Ok(description)
    }

    /// Upload `local_path`, creating the vault first if it does not exist.
    pub async fn put_archive(&self, vault: &str, local_path: &Path) -> Result<ArchiveId> {
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ColdVaultError::Usage(format!("{} is not a file path", local_path.display()))
            })?;
        if !tokio::fs::try_exists(local_path).await? {
            return Err(ColdVaultError::not_found("file", local_path.display().to_string()));
        }

        match self.ctx.storage.describe_vault(vault).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                info!(vault, "Vault was not found, creating it");
                self.create_vault(vault).await?;
                info!(vault, "vault created");
            }
            Err(e) => return Err(e),
        }

        info!(vault, file = file_name, "Uploading in a single operation");
        let description = archive_description(file_name, self.ctx.clock.now());
        let archive = self
            .ctx
            .storage
            .upload_archive(vault, &description, local_path)
            .await?;
        info!(vault, archive_id = %archive, description = %description, "Archive stored");
        Ok(archive)
    }

    pub async fn delete_vault(&self, vault: &str) -> Result<()> {
        self.ctx.storage.delete_vault(vault).await?;
        info!(vault, "Deleted vault");
        Ok(())
    }

    /// Download `archive` into `<download_dir>/<archive id>`.
    pub async fn get_archive(&self, vault: &str, archive: &ArchiveId) -> Result<PathBuf> {
        info!(vault, archive_id = %archive, "Getting archive");
        let dest = self.ctx.settings.download_dir.join(archive.as_str());
        self.ctx
            .storage
            .download_archive(vault, archive, &dest)
            .await?;
        Ok(dest)
    }

    pub async fn delete_archive(&self, vault: &str, archive: &ArchiveId) -> Result<()> {
        info!(vault, archive_id = %archive, "Deleting archive");
        self.ctx.storage.delete_archive(vault, archive).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::impls::{InMemoryBroker, LocalStorage};
    use crate::ports::{Clock, FixedClock};
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn local_context(tmp: &TempDir) -> ServiceContext {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap(),
        ));
        let mut settings = Settings::with_credentials("AK", "SK");
        settings.download_dir = tmp.path().join("downloads");
        let broker = Arc::new(InMemoryBroker::new("us-east-1", clock.clone()));
        let storage = Arc::new(LocalStorage::new(
            tmp.path().join("store"),
            "us-east-1",
            broker.clone(),
            clock.clone(),
        ));
        ServiceContext::new(settings, storage, broker.clone(), broker, clock)
    }

    #[test]
    fn description_carries_a_timestamp_suffix() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap();
        assert_eq!(archive_description("a.txt", at), "a.txt-20240309T083000Z");
    }

    #[tokio::test]
    async fn create_then_describe_matches_name() {
        let tmp = TempDir::new().unwrap();
        let ctx = local_context(&tmp);
        let desc = VaultOperations::new(&ctx).create_vault("test-vault").await.unwrap();
        assert_eq!(desc.vault_name, "test-vault");
    }

    #[tokio::test]
    async fn put_creates_missing_vault_then_uploads() {
        let tmp = TempDir::new().unwrap();
        let ctx = local_context(&tmp);
        let ops = VaultOperations::new(&ctx);
        let file = tmp.path().join("a.txt");
        std::fs::write(&file, "payload").unwrap();

        assert!(ctx.storage.describe_vault("test-vault").await.unwrap_err().is_not_found());
        let archive = ops.put_archive("test-vault", &file).await.unwrap();

        let desc = ctx.storage.describe_vault("test-vault").await.unwrap();
        assert_eq!(desc.number_of_archives, 1);

        let dest = ops.get_archive("test-vault", &archive).await.unwrap();
        assert_eq!(dest, tmp.path().join("downloads").join(archive.as_str()));
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "payload");
    }

    #[tokio::test]
    async fn put_of_missing_file_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let ctx = local_context(&tmp);
        let err = VaultOperations::new(&ctx)
            .put_archive("test-vault", &tmp.path().join("missing.txt"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(ctx.storage.describe_vault("test-vault").await.is_err());
    }

    #[tokio::test]
    async fn delete_vault_twice_reports_not_found() {
        let tmp = TempDir::new().unwrap();
        let ctx = local_context(&tmp);
        let ops = VaultOperations::new(&ctx);
        ops.create_vault("test-vault").await.unwrap();

        ops.delete_vault("test-vault").await.unwrap();
        assert!(ops.delete_vault("test-vault").await.unwrap_err().is_not_found());
    }
}
