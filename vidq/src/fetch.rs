//! Stream retrieval.
//!
//! [`Fetcher`] downloads the selected streams of one item to local storage.
//! [`YtDlpFetcher`] drives yt-dlp, which also joins the chosen video and audio
//! streams into a single intermediate file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{FetchResult, ItemMetadata};
use crate::utils::process::{run_command_with_output, tokio_command};
use crate::{Error, Result};

/// Best available video combined with best available audio.
pub const BEST_VIDEO_AUDIO: &str = "bestvideo+bestaudio";

/// Output name template; yt-dlp fills in the title and the container extension.
pub const TITLE_TEMPLATE: &str = "%(title)s.%(ext)s";

/// A single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub locator: String,
    /// Full output template, including the destination directory.
    pub output_template: PathBuf,
    pub format_selector: String,
    /// Container used when the fetcher has to join separate streams.
    pub merge_container: String,
}

impl FetchRequest {
    /// Request the best video + best audio, named after the title, inside `dir`.
    pub fn best_in_dir(
        locator: impl Into<String>,
        dir: &Path,
        merge_container: impl Into<String>,
    ) -> Self {
        Self {
            locator: locator.into(),
            output_template: dir.join(TITLE_TEMPLATE),
            format_selector: BEST_VIDEO_AUDIO.to_string(),
            merge_container: merge_container.into(),
        }
    }
}

/// Retrieves streams for a locator.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult>;
}

/// yt-dlp backed fetcher.
pub struct YtDlpFetcher {
    binary_path: String,
}

impl YtDlpFetcher {
    /// Create a fetcher using `YTDLP_PATH` or `yt-dlp` from `PATH`.
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

    fn build_args(request: &FetchRequest) -> Vec<String> {
        vec![
            "-f".to_string(),
            request.format_selector.clone(),
            "--merge-output-format".to_string(),
            request.merge_container.clone(),
            "-o".to_string(),
            request.output_template.to_string_lossy().to_string(),
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--no-warnings".to_string(),
            // Info JSON first, final path after post-processing.
            "--dump-json".to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "--".to_string(),
            request.locator.clone(),
        ]
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult> {
        let args = Self::build_args(request);
        debug!("yt-dlp args: {:?}", args);

        let mut cmd = tokio_command(&self.binary_path);
        cmd.args(&args);

        let output = run_command_with_output(&mut cmd)
            .await
            .map_err(|e| Error::fetch(&request.locator, e.to_string()))?;

        if !output.success() {
            return Err(Error::fetch(
                &request.locator,
                format!("yt-dlp exited with code {}: {}", output.code(), output.error_detail()),
            ));
        }

        let result = parse_fetch_output(&request.locator, &output.stdout)?;
        info!(
            locator = %request.locator,
            path = %result.downloaded_path.display(),
            "Fetch finished in {:.2}s",
            output.duration
        );
        Ok(result)
    }
}

/// Parse yt-dlp stdout: one info JSON line plus the final path line.
///
/// The printed path wins over the JSON's prepared filename, which does not
/// account for post-processing.
pub(crate) fn parse_fetch_output(locator: &str, stdout: &[String]) -> Result<FetchResult> {
    let info: Value = stdout
        .iter()
        .map(|line| line.trim())
        .rfind(|line| line.starts_with('{'))
        .ok_or_else(|| Error::fetch(locator, "yt-dlp printed no info JSON"))
        .and_then(|line| {
            serde_json::from_str(line)
                .map_err(|e| Error::fetch(locator, format!("unreadable info JSON: {}", e)))
        })?;

    let printed_path = stdout
        .iter()
        .map(|line| line.trim())
        .rfind(|line| !line.is_empty() && !line.starts_with('{'));

    let prepared_path = ["filepath", "filename", "_filename"]
        .iter()
        .find_map(|key| info.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty());

    let downloaded_path = printed_path
        .or(prepared_path)
        .map(PathBuf::from)
        .ok_or_else(|| Error::fetch(locator, "yt-dlp did not report an output path"))?;

    let metadata: ItemMetadata = serde_json::from_value(info)
        .map_err(|e| Error::fetch(locator, format!("unreadable info JSON: {}", e)))?;

    Ok(FetchResult {
        downloaded_path,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_best_in_dir() {
        let request = FetchRequest::best_in_dir("x", Path::new("/media/Alice"), "mkv");
        assert_eq!(request.format_selector, "bestvideo+bestaudio");
        assert_eq!(
            request.output_template,
            PathBuf::from("/media/Alice").join("%(title)s.%(ext)s")
        );
    }

    #[test]
    fn test_build_args() {
        let request =
            FetchRequest::best_in_dir("https://example.com/v/1", Path::new("/media"), "mkv");
        let args = YtDlpFetcher::build_args(&request);

        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], "bestvideo+bestaudio");
        let merge = args.iter().position(|a| a == "--merge-output-format").unwrap();
        assert_eq!(args[merge + 1], "mkv");
        assert!(args.contains(&"--no-simulate".to_string()));
        assert_eq!(args.last().unwrap(), "https://example.com/v/1");
    }

    #[test]
    fn test_parse_prefers_printed_path() {
        let stdout = lines(&[
            r#"{"title": "Clip", "uploader": "Alice", "filename": "/media/Clip.webm"}"#,
            "/media/Clip.mkv",
        ]);
        let result = parse_fetch_output("x", &stdout).unwrap();
        assert_eq!(result.downloaded_path, PathBuf::from("/media/Clip.mkv"));
        assert_eq!(result.metadata.title.as_deref(), Some("Clip"));
    }

    #[test]
    fn test_parse_falls_back_to_prepared_filename() {
        let stdout = lines(&[r#"{"title": "Clip", "_filename": "/media/Clip.mp4"}"#]);
        let result = parse_fetch_output("x", &stdout).unwrap();
        assert_eq!(result.downloaded_path, PathBuf::from("/media/Clip.mp4"));
    }

    #[test]
    fn test_parse_keeps_fetch_time_dynamic_range() {
        let stdout = lines(&[
            r#"{"dynamic_range": "HDR10", "formats": [{"format_id": "1", "vcodec": "vp9"}]}"#,
            "/media/Clip.mkv",
        ]);
        let result = parse_fetch_output("x", &stdout).unwrap();
        assert_eq!(result.metadata.dynamic_range.as_deref(), Some("HDR10"));
        assert_eq!(result.metadata.streams.len(), 1);
    }

    #[test]
    fn test_parse_without_json() {
        let err = parse_fetch_output("x", &lines(&["/media/Clip.mkv"])).unwrap_err();
        assert!(matches!(err, Error::FetchFailed { .. }));
    }

    #[test]
    fn test_parse_without_any_path() {
        let err = parse_fetch_output("x", &lines(&[r#"{"title": "Clip"}"#])).unwrap_err();
        assert!(err.to_string().contains("did not report an output path"));
    }
}
