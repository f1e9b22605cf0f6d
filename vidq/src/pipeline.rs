//! Per-task fetch-and-remux pipeline.
//!
//! One call to [`FetchPipeline::process`] takes a task from locator to a
//! merged file:
//!
//! 1. pick the output directory (optionally a sanitized uploader subfolder)
//! 2. fetch best video + best audio through the [`Fetcher`]
//! 3. re-derive the dynamic range from what was actually fetched
//! 4. stream-copy the download into a temporary sibling of the merged path
//! 5. delete any existing merged file, then move the temporary file onto it
//!
//! Every step can fail; a failure aborts only this task and nothing is
//! retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::Task;
use crate::fetch::{FetchRequest, Fetcher};
use crate::remux::{DEFAULT_CONTAINER, DEFAULT_TEMP_SUFFIX, MergePaths, Remuxer};
use crate::selector::StreamSelector;
use crate::utils::filename::sanitize_component;
use crate::utils::fs::{ensure_dir_all, remove_file_if_exists, replace_file};
use crate::Result;

/// Tunables taken from the application config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Target container extension.
    pub container: String,
    /// Appended to the merged path for the in-progress file.
    pub temp_suffix: String,
    /// Delete the downloaded file after a successful merge when it is not the merged file itself.
    pub remove_intermediate: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
            remove_intermediate: false,
        }
    }
}

/// Successful result of processing one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub merged_path: PathBuf,
    /// Dynamic range derived at fetch time.
    pub dynamic_range: String,
}

/// Progress notifications emitted while a task is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStep {
    Downloaded { path: PathBuf },
    Merged { path: PathBuf },
}

/// Orchestrates fetch and remux for one task at a time.
pub struct FetchPipeline {
    fetcher: Arc<dyn Fetcher>,
    remuxer: Arc<dyn Remuxer>,
    selector: StreamSelector,
    options: PipelineOptions,
}

impl FetchPipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, remuxer: Arc<dyn Remuxer>) -> Self {
        Self::with_options(fetcher, remuxer, PipelineOptions::default())
    }

    pub fn with_options(
        fetcher: Arc<dyn Fetcher>,
        remuxer: Arc<dyn Remuxer>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            fetcher,
            remuxer,
            selector: StreamSelector::new(),
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Directory a task's output goes to.
    pub fn output_dir(task: &Task, destination: &Path, use_uploader_subfolder: bool) -> PathBuf {
        match task.known_uploader() {
            Some(uploader) if use_uploader_subfolder => {
                destination.join(sanitize_component(uploader))
            }
            _ => destination.to_path_buf(),
        }
    }

    /// Process a task without step notifications.
    pub async fn process(
        &self,
        task: &Task,
        destination: &Path,
        use_uploader_subfolder: bool,
    ) -> Result<ProcessOutcome> {
        self.process_with_steps(task, destination, use_uploader_subfolder, &|_| {})
            .await
    }

    /// Process a task, reporting each completed step to `on_step`.
    pub async fn process_with_steps(
        &self,
        task: &Task,
        destination: &Path,
        use_uploader_subfolder: bool,
        on_step: &(dyn Fn(PipelineStep) + Send + Sync),
    ) -> Result<ProcessOutcome> {
        let output_dir = Self::output_dir(task, destination, use_uploader_subfolder);
        ensure_dir_all(&output_dir).await?;

        let request =
            FetchRequest::best_in_dir(task.locator(), &output_dir, self.options.container.clone());
        let fetched = self.fetcher.fetch(&request).await?;
        info!("Downloaded: {}", fetched.downloaded_path.display());
        on_step(PipelineStep::Downloaded {
            path: fetched.downloaded_path.clone(),
        });

        // Fetch-time metadata wins over what was recorded when the task was added.
        let dynamic_range = self.selector.select(&fetched.metadata).dynamic_range;
        if dynamic_range != task.dynamic_range() {
            info!(
                locator = %task.locator(),
                queued = %task.dynamic_range(),
                fetched = %dynamic_range,
                "Dynamic range changed since the task was queued"
            );
        }

        let paths = MergePaths::derive(
            &fetched.downloaded_path,
            &self.options.container,
            &self.options.temp_suffix,
        );
        debug!(
            merged = %paths.merged.display(),
            temp = %paths.temp.display(),
            "Remuxing"
        );

        if let Err(e) = self.remuxer.remux(&fetched.downloaded_path, &paths.temp).await {
            // Drop the partial output; an existing merged file stays as it was.
            if let Err(cleanup) = remove_file_if_exists(&paths.temp).await {
                warn!("Failed to clean up {}: {}", paths.temp.display(), cleanup);
            }
            return Err(e);
        }

        replace_file(&paths.temp, &paths.merged).await?;

        if self.options.remove_intermediate && fetched.downloaded_path != paths.merged {
            match remove_file_if_exists(&fetched.downloaded_path).await {
                Ok(_) => debug!(
                    "Removed intermediate file: {}",
                    fetched.downloaded_path.display()
                ),
                Err(e) => warn!("Failed to remove intermediate file: {}", e),
            }
        }

        info!("Merged to: {}", paths.merged.display());
        on_step(PipelineStep::Merged {
            path: paths.merged.clone(),
        });

        Ok(ProcessOutcome {
            merged_path: paths.merged,
            dynamic_range,
        })
    }
}
