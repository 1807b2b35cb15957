//! Configuration management for gitsync
//!
//! Settings are layered with figment: embedded defaults, the user config,
//! the working-directory config (or an explicit `--config` file), then
//! `GITSYNC_` environment variables.

mod core;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for gitsync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSyncConfig {
    /// Location of the tracked-repository registry document
    pub registry_path: PathBuf,

    /// Branch assumed for records that do not name one
    pub default_branch: String,

    /// Host used to build `origin` URLs when a token is injected
    pub remote_host: String,

    /// Name or path of the git executable
    pub git_binary: String,

    /// Access token for private remotes; empty means anonymous access
    #[serde(default)]
    pub token: String,

    /// Pre-reset backup settings
    #[serde(default)]
    pub backup: BackupConfig,
}

/// Backup behaviour before destructive recovery steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Copy the working tree aside before any hard reset
    pub enabled: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl GitSyncConfig {
    /// The configured token, if any
    pub fn token(&self) -> Option<&str> {
        let token = self.token.trim();
        (!token.is_empty()).then_some(token)
    }
}
