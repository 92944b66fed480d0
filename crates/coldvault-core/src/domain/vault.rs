//! Vault description as reported by the storage service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::VaultArn;

/// Snapshot of a vault's metadata.
///
/// The inventory counters (`number_of_archives`, `size_in_bytes`) are the
/// ones the service reports; they may lag behind the vault's real content
/// until the next inventory runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VaultDescription {
    pub vault_name: String,
    #[serde(rename = "VaultARN")]
    pub vault_arn: VaultArn,
    pub creation_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_inventory_date: Option<DateTime<Utc>>,
    pub number_of_archives: u64,
    pub size_in_bytes: u64,
}

impl fmt::Display for VaultDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last_inventory = self
            .last_inventory_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        write!(
            f,
            "CreationDate: {}, LastInventoryDate: {}, NumberOfArchives: {}, SizeInBytes: {}, VaultARN: {}, VaultName: {}",
            self.creation_date.to_rfc3339(),
            last_inventory,
            self.number_of_archives,
            self.size_in_bytes,
            self.vault_arn,
            self.vault_name,
        )
    }
}
