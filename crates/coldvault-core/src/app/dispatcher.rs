//! OperationDispatcher - routes one requested operation to its handler.

use std::path::Path;

use tokio::sync::watch;
use tracing::{error, info, warn};

use super::context::ServiceContext;
use super::inventory::InventoryCoordinator;
use super::operations::VaultOperations;
use crate::domain::{ArchiveId, Operation};
use crate::error::{ColdVaultError, ErrorKind};

/// How an operation ended. Every error is folded in here.
#[derive(Debug)]
pub enum DispatchOutcome {
    Succeeded,
    Failed(ColdVaultError),
    /// Unknown operation token; nothing was done.
    Unsupported(String),
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// 0 = success (or no-op), 1 = usage error, 2 = operation failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Succeeded | Self::Unsupported(_) => 0,
            Self::Failed(e) if e.kind() == ErrorKind::Usage => 1,
            Self::Failed(_) => 2,
        }
    }
}

pub struct OperationDispatcher<'a> {
    ctx: &'a ServiceContext,
    cancel: watch::Receiver<bool>,
}

impl<'a> OperationDispatcher<'a> {
    pub fn new(ctx: &'a ServiceContext, cancel: watch::Receiver<bool>) -> Self {
        Self { ctx, cancel }
    }

    /// Run `op` against `vault`. `file` is a local path for `put` and an
    /// archive id for `getFile` / `deleteFile`.
    ///
    /// Logs exactly one summary line.
    pub async fn dispatch(&self, op: &Operation, vault: &str, file: Option<&str>) -> DispatchOutcome {
        let ops = VaultOperations::new(self.ctx);

        let (subject, result) = match op {
            Operation::Create => (
                format!("Vault {vault}"),
                ops.create_vault(vault).await.map(|_| ()),
            ),
            Operation::Put => {
                let file = file.unwrap_or_default();
                let result = match required(op, file) {
                    Ok(path) => ops.put_archive(vault, Path::new(path)).await.map(|_| ()),
                    Err(e) => Err(e),
                };
                (file.to_string(), result)
            }
            Operation::ListVault => {
                let coordinator = InventoryCoordinator::new(self.ctx);
                (
                    format!("Vault {vault}"),
                    coordinator
                        .run(vault, self.cancel.clone())
                        .await
                        .map(|_| ())
                        .map_err(|failure| failure.error),
                )
            }
            Operation::DeleteVault => (format!("Vault {vault}"), ops.delete_vault(vault).await),
            Operation::GetFile => {
                let file = file.unwrap_or_default();
                let result = match required(op, file) {
                    Ok(id) => ops.get_archive(vault, &ArchiveId::new(id)).await.map(|_| ()),
                    Err(e) => Err(e),
                };
                (format!("File {file}"), result)
            }
            Operation::DeleteFile => {
                let file = file.unwrap_or_default();
                let result = match required(op, file) {
                    Ok(id) => ops.delete_archive(vault, &ArchiveId::new(id)).await,
                    Err(e) => Err(e),
                };
                (format!("File {file}"), result)
            }
            Operation::Unsupported(token) => {
                warn!(operation = %token, "Command not supported.");
                return DispatchOutcome::Unsupported(token.clone());
            }
        };

        match result {
            Ok(()) => {
                info!(operation = %op, "{subject} {}", success_phrase(op));
                DispatchOutcome::Succeeded
            }
            Err(e) => {
                error!(operation = %op, error = %e, "{subject} {}", failure_phrase(op));
                DispatchOutcome::Failed(e)
            }
        }
    }
}

fn required<'f>(op: &Operation, file: &'f str) -> Result<&'f str, ColdVaultError> {
    if file.trim().is_empty() {
        Err(ColdVaultError::Usage(format!("{op} needs a file name")))
    } else {
        Ok(file)
    }
}

fn success_phrase(op: &Operation) -> &'static str {
    match op {
        Operation::Create => "successfully created.",
        Operation::Put => "uploaded successfully.",
        Operation::ListVault => "listed successfully.",
        Operation::DeleteVault => "deleted successfully.",
        Operation::GetFile => "retrieved successfully.",
        Operation::DeleteFile => "deleted successfully.",
        Operation::Unsupported(_) => "not supported.",
    }
}

fn failure_phrase(op: &Operation) -> &'static str {
    match op {
        Operation::Create => "not created.",
        Operation::Put => "not uploaded.",
        Operation::ListVault => "not listed.",
        Operation::DeleteVault => "not deleted.",
        Operation::GetFile => "not retrieved.",
        Operation::DeleteFile => "not deleted.",
        Operation::Unsupported(_) => "not supported.",
    }
}
