//! Persisted application configuration.
//!
//! Stored as pretty-printed JSON. Loaded once at startup and passed down
//! explicitly; nothing reads it from a global.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::pipeline::PipelineOptions;
use crate::remux::{DEFAULT_CONTAINER, DEFAULT_TEMP_SUFFIX};
use crate::resolver::expander::DEFAULT_ITEM_TEMPLATE;
use crate::utils::fs::ensure_dir_all;
use crate::{Error, Result};

/// File name inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Destination directory of the last submission.
    #[serde(default = "default_path")]
    pub default_path: String,
    /// Every destination used so far, oldest first.
    #[serde(default)]
    pub history_paths: Vec<String>,
    /// Place output in a subfolder named after the uploader.
    #[serde(default)]
    pub use_subfolders: bool,
    /// yt-dlp binary; `YTDLP_PATH` takes precedence.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,
    /// ffmpeg binary; `FFMPEG_PATH` takes precedence.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    /// Canonical locator for playlist entries, `{id}` is substituted.
    #[serde(default = "default_item_template")]
    pub item_locator_template: String,
    #[serde(default = "default_container")]
    pub merge_container: String,
    #[serde(default = "default_temp_suffix")]
    pub temp_suffix: String,
    /// Delete the downloaded file once the merged file is in place.
    #[serde(default)]
    pub remove_intermediate: bool,
    /// Directory for daily log files. No file logging when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_path() -> String {
    "./downloads".to_string()
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_item_template() -> String {
    DEFAULT_ITEM_TEMPLATE.to_string()
}

fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

fn default_temp_suffix() -> String {
    DEFAULT_TEMP_SUFFIX.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_path: default_path(),
            history_paths: Vec::new(),
            use_subfolders: false,
            ytdlp_path: default_ytdlp_path(),
            ffmpeg_path: default_ffmpeg_path(),
            item_locator_template: default_item_template(),
            merge_container: default_container(),
            temp_suffix: default_temp_suffix(),
            remove_intermediate: false,
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// `<platform config dir>/vidq/config.json`, if the platform has one.
    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vidq").join(CONFIG_FILE_NAME))
    }

    /// Load from `path`, writing the defaults there first if the file does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                let config = Self::from_json(&raw).map_err(|e| {
                    Error::config(format!("invalid config file {}: {}", path.display(), e))
                })?;
                debug!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save(path).await?;
                info!("Created default configuration at {}", path.display());
                Ok(config)
            }
            Err(e) => Err(Error::io_path("reading", path, e)),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| Error::io_path("writing", path, e))
    }

    /// Remember the destination and subfolder choice of a queue submission.
    pub fn record_submission(&mut self, destination: &str, use_subfolders: bool) {
        self.default_path = destination.to_string();
        if !self.history_paths.iter().any(|p| p == destination) {
            self.history_paths.push(destination.to_string());
        }
        self.use_subfolders = use_subfolders;
    }

    pub fn ytdlp_binary(&self) -> String {
        std::env::var("YTDLP_PATH").unwrap_or_else(|_| self.ytdlp_path.clone())
    }

    pub fn ffmpeg_binary(&self) -> String {
        std::env::var("FFMPEG_PATH").unwrap_or_else(|_| self.ffmpeg_path.clone())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            container: self.merge_container.clone(),
            temp_suffix: self.temp_suffix.clone(),
            remove_intermediate: self.remove_intermediate,
        }
    }
}
