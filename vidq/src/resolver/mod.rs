//! Metadata resolution for locators.
//!
//! [`MetadataResolver`] is the seam to the external metadata service. The
//! shipped implementation shells out to yt-dlp and parses its info JSON.

pub mod expander;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ItemMetadata;
use crate::utils::process::{run_command_with_output, tokio_command};
use crate::{Error, Result};

pub use expander::{LocatorExpander, LocatorKind};

/// How much detail to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Title, uploader and per-stream detail for a single item.
    Full,
    /// Entry identifiers only, for playlist expansion.
    Flat,
}

/// Resolves a locator into metadata.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, locator: &str, mode: ResolveMode) -> Result<ItemMetadata>;
}

/// yt-dlp backed resolver.
pub struct YtDlpResolver {
    binary_path: String,
}

impl YtDlpResolver {
    /// Create a resolver using `YTDLP_PATH` or `yt-dlp` from `PATH`.
    pub fn new() -> Self {
        Self {
            binary_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
        }
    }

    /// Create with a custom yt-dlp path.
    pub fn with_binary_path(path: impl Into<String>) -> Self {
        Self {
            binary_path: path.into(),
        }
    }

    fn build_args(locator: &str, mode: ResolveMode) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "--quiet".to_string(),
        ];
        match mode {
            ResolveMode::Full => args.push("--no-playlist".to_string()),
            ResolveMode::Flat => args.push("--flat-playlist".to_string()),
        }
        args.push("--".to_string());
        args.push(locator.to_string());
        args
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataResolver for YtDlpResolver {
    async fn resolve(&self, locator: &str, mode: ResolveMode) -> Result<ItemMetadata> {
        let args = Self::build_args(locator, mode);
        debug!("yt-dlp args: {:?}", args);

        let mut cmd = tokio_command(&self.binary_path);
        cmd.args(&args);

        let output = run_command_with_output(&mut cmd)
            .await
            .map_err(|e| Error::resolution(locator, e.to_string()))?;

        if !output.success() {
            return Err(Error::resolution(
                locator,
                format!("yt-dlp exited with code {}: {}", output.code(), output.error_detail()),
            ));
        }

        parse_info_json(locator, &output.stdout.join("\n"))
    }
}

/// Parse resolver JSON output; blank output counts as a failed resolution.
pub(crate) fn parse_info_json(locator: &str, raw: &str) -> Result<ItemMetadata> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::resolution(locator, "resolver returned no data"));
    }

    serde_json::from_str(raw)
        .map_err(|e| Error::resolution(locator, format!("unreadable resolver output: {}", e)))
}
