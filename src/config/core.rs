use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Json, Toml},
};
use std::path::{Path, PathBuf};

use super::GitSyncConfig;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

impl GitSyncConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_custom_config(None)
    }

    pub fn load_with_custom_config(custom_config: Option<&str>) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        // A custom config replaces the user and repository layers entirely
        if let Some(custom_path) = custom_config {
            figment = merge_file(figment, Path::new(custom_path));
        } else {
            let user_config = Self::user_config_path();
            figment = figment
                .merge(Toml::file(&user_config))
                .merge(Json::file(user_config.with_extension("json")))
                .merge(Toml::file("gitsync.toml"))
                .merge(Json::file("gitsync.json"));
        }

        // Environment variables always have highest priority
        figment = figment.merge(Env::prefixed("GITSYNC_").split("__"));

        let mut config: GitSyncConfig = figment
            .extract()
            .context("Failed to load gitsync configuration")?;
        config.registry_path = expand_home(&config.registry_path);

        tracing::debug!("Registry path: {}", config.registry_path.display());
        Ok(config)
    }

    fn user_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("~"))
            .join(".config/gitsync/config.toml")
    }
}

fn merge_file(figment: Figment, path: &Path) -> Figment {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => figment.merge(Json::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
