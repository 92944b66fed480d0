//! Settings - TOML configuration for one invocation.
//!
//! Credentials are required; every other key has a default.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ColdVaultError, Result};

/// Opaque access credentials. The secret never shows up in `Debug` output.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Tool configuration, loaded from a TOML file.
///
/// Only the credentials are required; everything else has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(flatten)]
    pub credentials: Credentials,

    #[serde(default = "default_region")]
    pub region: String,

    /// Seconds to wait between polls that returned nothing.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Overall limit on waiting for an inventory job. Unset means no limit.
    #[serde(default)]
    pub max_wait_secs: Option<u64>,

    #[serde(default = "default_dir")]
    pub download_dir: PathBuf,

    #[serde(default = "default_dir")]
    pub inventory_dir: PathBuf,

    /// Root directory of the local storage backend.
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    /// Prefix of the per-run queue and topic names.
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_poll_interval_secs() -> u64 {
    600
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(".coldvault")
}

fn default_channel_prefix() -> String {
    "ColdVaultInventory".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Settings {
    /// Settings with the given credentials and defaults everywhere else.
    pub fn with_credentials(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            credentials: Credentials {
                access_key: access_key.into(),
                secret_key: secret_key.into(),
            },
            region: default_region(),
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: None,
            download_dir: default_dir(),
            inventory_dir: default_dir(),
            storage_root: default_storage_root(),
            channel_prefix: default_channel_prefix(),
        }
    }

    /// Load and validate settings from `path`.
    ///
    /// A missing file, a parse failure or empty credentials are all
    /// configuration errors.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ColdVaultError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
            .map_err(|e| ColdVaultError::Configuration(format!("{}: {e}", path.display())))
    }

    fn from_toml(contents: &str) -> std::result::Result<Self, String> {
        let settings: Settings = toml::from_str(contents).map_err(|e| e.to_string())?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.credentials.access_key.trim().is_empty()
            || self.credentials.secret_key.trim().is_empty()
        {
            return Err("invalid security tokens: access_key and secret_key must be set".into());
        }
        if self.region.trim().is_empty() {
            return Err("region must not be empty".into());
        }
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be at least 1".into());
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }

    /// Service endpoint for `service` in the configured region.
    pub fn endpoint(&self, service: &str) -> String {
        format!("https://{service}.{}.amazonaws.com", self.region)
    }
}
