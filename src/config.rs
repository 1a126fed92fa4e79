use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_SHARED_GROUP;
use crate::error::ReplayError;

pub const DEFAULT_CONFIG_FILE: &str = "indy-replay.json";
pub const TEST_MOUNT_PATH_ENV: &str = "TEST_MOUNT_PATH";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub download_dir: Option<String>,
    #[serde(default)]
    pub upload_dir: Option<String>,
    #[serde(default)]
    pub target_dir: Option<String>,
    #[serde(default)]
    pub dataset_dir: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub metadata_workers: Option<usize>,
    #[serde(default)]
    pub shared_group: Option<String>,
    #[serde(default)]
    pub promote_target: Option<String>,
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub download_dir: Utf8PathBuf,
    pub upload_dir: Utf8PathBuf,
    pub target_dir: Utf8PathBuf,
    pub dataset_dir: Utf8PathBuf,
    pub cache_dir: Utf8PathBuf,
    pub workers: usize,
    pub metadata_workers: usize,
    pub shared_group: String,
    pub promote_target: String,
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: Utf8PathBuf::from("/tmp/download"),
            upload_dir: Utf8PathBuf::from("/tmp/upload"),
            target_dir: Utf8PathBuf::from("target"),
            dataset_dir: Utf8PathBuf::from("dataset"),
            cache_dir: default_cache_dir(),
            workers: 1,
            metadata_workers: 4,
            shared_group: DEFAULT_SHARED_GROUP.to_string(),
            promote_target: "pnc-builds".to_string(),
            http_timeout_secs: 300,
        }
    }
}

pub struct SettingsLoader;

impl SettingsLoader {
    pub fn resolve(path: Option<&str>) -> Result<Settings, ReplayError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ReplayError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ReplayError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> Settings {
        let defaults = Settings::default();
        Settings {
            download_dir: config
                .download_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.download_dir),
            upload_dir: config
                .upload_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            target_dir: config
                .target_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.target_dir),
            dataset_dir: config
                .dataset_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.dataset_dir),
            cache_dir: config
                .cache_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            workers: config.workers.unwrap_or(defaults.workers).max(1),
            metadata_workers: config
                .metadata_workers
                .unwrap_or(defaults.metadata_workers)
                .max(1),
            shared_group: config.shared_group.unwrap_or(defaults.shared_group),
            promote_target: config.promote_target.unwrap_or(defaults.promote_target),
            http_timeout_secs: config
                .http_timeout_secs
                .unwrap_or(defaults.http_timeout_secs),
        }
    }
}

fn default_cache_dir() -> Utf8PathBuf {
    if let Ok(mount) = std::env::var(TEST_MOUNT_PATH_ENV) {
        if !mount.trim().is_empty() {
            return Utf8PathBuf::from(mount.trim());
        }
    }
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("indy-replay")).ok()
        })
        .unwrap_or_else(|| Utf8PathBuf::from("target/cache"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let settings = SettingsLoader::resolve_config(Config::default());
        assert_eq!(settings.download_dir, Utf8PathBuf::from("/tmp/download"));
        assert_eq!(settings.upload_dir, Utf8PathBuf::from("/tmp/upload"));
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.metadata_workers, 4);
        assert_eq!(settings.promote_target, "pnc-builds");
    }

    #[test]
    fn zero_workers_is_clamped() {
        let settings = SettingsLoader::resolve_config(Config {
            workers: Some(0),
            ..Config::default()
        });
        assert_eq!(settings.workers, 1);
    }
}
