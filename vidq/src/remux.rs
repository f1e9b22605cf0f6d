//! Lossless remux into the target container.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::utils::process::{run_command_with_output, tokio_command};
use crate::{Error, Result};

/// Default target container.
pub const DEFAULT_CONTAINER: &str = "mkv";

/// Default suffix appended to the merged path while ffmpeg writes.
pub const DEFAULT_TEMP_SUFFIX: &str = ".tmp.mkv";

/// Output locations for one merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePaths {
    /// Final output: the downloaded path with the container extension.
    pub merged: PathBuf,
    /// Sibling written by the remux tool, renamed onto `merged` on success.
    pub temp: PathBuf,
}

impl MergePaths {
    pub fn derive(downloaded: &Path, container: &str, temp_suffix: &str) -> Self {
        let merged = downloaded.with_extension(container);
        let mut temp_name: OsString = merged.clone().into_os_string();
        temp_name.push(temp_suffix);
        Self {
            merged,
            temp: PathBuf::from(temp_name),
        }
    }
}

/// Copies encoded streams into a new container without re-encoding.
#[async_trait]
pub trait Remuxer: Send + Sync {
    async fn remux(&self, input: &Path, output: &Path) -> Result<()>;
}

/// ffmpeg stream-copy remuxer.
pub struct FfmpegRemuxer {
    ffmpeg_path: String,
}

impl FfmpegRemuxer {
    /// Create a remuxer using `FFMPEG_PATH` or `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self {
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
        }
    }

    /// Create with a custom ffmpeg path.
    pub fn with_ffmpeg_path(path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: path.into(),
        }
    }

    /// `-y -i <input> -c copy <output>`, in this exact order.
    fn build_args(input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_os_string(),
            "-c".into(),
            "copy".into(),
            output.as_os_str().to_os_string(),
        ]
    }
}

impl Default for FfmpegRemuxer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn remux(&self, input: &Path, output: &Path) -> Result<()> {
        let args = Self::build_args(input, output);
        debug!("FFmpeg args: {:?}", args);

        let mut cmd = tokio_command(&self.ffmpeg_path);
        cmd.args(&args).env("LC_ALL", "C");

        let output_result = run_command_with_output(&mut cmd)
            .await
            .map_err(|e| Error::remux(output, -1, e.to_string()))?;

        if !output_result.success() {
            return Err(Error::remux(
                output,
                output_result.code(),
                output_result.error_detail(),
            ));
        }

        debug!(
            "Remux completed in {:.2}s: {}",
            output_result.duration,
            output.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_paths() {
        let paths = MergePaths::derive(Path::new("/media/clip.mp4"), "mkv", ".tmp.mkv");
        assert_eq!(paths.merged, PathBuf::from("/media/clip.mkv"));
        assert_eq!(paths.temp, PathBuf::from("/media/clip.mkv.tmp.mkv"));
    }

    #[test]
    fn test_merge_paths_same_container() {
        let paths = MergePaths::derive(Path::new("/media/clip.mkv"), "mkv", ".tmp.mkv");
        assert_eq!(paths.merged, PathBuf::from("/media/clip.mkv"));
        assert_ne!(paths.temp, paths.merged);
    }

    #[test]
    fn test_merge_paths_dotted_title() {
        let paths = MergePaths::derive(Path::new("/media/Part 1.5 final.webm"), "mkv", ".tmp.mkv");
        assert_eq!(paths.merged, PathBuf::from("/media/Part 1.5 final.mkv"));
    }

    #[test]
    fn test_build_args_exact_order() {
        let args = FfmpegRemuxer::build_args(Path::new("clip.mp4"), Path::new("clip.mkv.tmp.mkv"));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec!["-y", "-i", "clip.mp4", "-c", "copy", "clip.mkv.tmp.mkv"]
        );
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_remux_failure() {
        let remuxer = FfmpegRemuxer::with_ffmpeg_path("vidq-no-such-ffmpeg");
        let err = remuxer
            .remux(Path::new("in.mp4"), Path::new("out.mkv"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RemuxFailed { code: -1, .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        // `false` ignores its arguments and exits with 1.
        let remuxer = FfmpegRemuxer::with_ffmpeg_path("false");
        let err = remuxer
            .remux(Path::new("in.mp4"), Path::new("out.mkv"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RemuxFailed { code: 1, .. }));
    }
}
