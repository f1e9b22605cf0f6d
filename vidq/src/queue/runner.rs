//! Sequential queue processing.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::TaskStore;
use crate::domain::TaskId;
use crate::pipeline::{FetchPipeline, PipelineStep};

/// Progress notifications for a presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Started {
        id: TaskId,
        locator: String,
        title: String,
    },
    Downloaded {
        id: TaskId,
        path: PathBuf,
    },
    Merged {
        id: TaskId,
        path: PathBuf,
    },
    Completed {
        id: TaskId,
        locator: String,
        path: PathBuf,
        dynamic_range: String,
    },
    Failed {
        id: TaskId,
        locator: String,
        error: String,
    },
    /// Stop requested; the listed number of selected tasks were not started.
    Cancelled { remaining: usize },
    Finished { completed: usize, failed: usize },
}

/// One successfully processed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedItem {
    pub locator: String,
    pub title: String,
    pub merged_path: PathBuf,
    pub dynamic_range: String,
}

/// One failed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub locator: String,
    pub title: String,
    pub error: String,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: Vec<CompletedItem>,
    pub failed: Vec<FailedItem>,
    /// Selected tasks left in the store because a stop was requested.
    pub skipped: usize,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

/// Where and how a run writes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTarget {
    pub destination: PathBuf,
    pub use_uploader_subfolder: bool,
}

impl RunTarget {
    pub fn new(destination: impl Into<PathBuf>, use_uploader_subfolder: bool) -> Self {
        Self {
            destination: destination.into(),
            use_uploader_subfolder,
        }
    }
}

/// Processes selected tasks strictly one at a time.
pub struct QueueRunner {
    pipeline: Arc<FetchPipeline>,
    events: Option<UnboundedSender<QueueEvent>>,
    cancel: CancellationToken,
}

impl QueueRunner {
    pub fn new(pipeline: Arc<FetchPipeline>) -> Self {
        Self {
            pipeline,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Send [`QueueEvent`]s to `events`.
    pub fn with_events(mut self, events: UnboundedSender<QueueEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Stop before the next task once `cancel` fires. The task in flight always completes.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn emit(&self, event: QueueEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = events.send(event);
        }
    }

    /// Run the tasks at `indices`, in the order given.
    ///
    /// Every processed task is removed from `store` whether it succeeded or
    /// not. Indices that do not exist, or repeat, are ignored.
    pub async fn run(
        &self,
        store: &mut TaskStore,
        indices: &[usize],
        target: &RunTarget,
    ) -> RunSummary {
        // Later removals reindex the store, so pin the selection to ids first.
        let mut selected: Vec<TaskId> = Vec::with_capacity(indices.len());
        for &index in indices {
            match store.id_for_index(index) {
                Some(id) if !selected.contains(&id) => selected.push(id),
                Some(_) => debug!(index, "Ignoring repeated selection"),
                None => warn!(index, "Ignoring selection of missing task"),
            }
        }

        info!(
            tasks = selected.len(),
            destination = %target.destination.display(),
            "Starting queue run"
        );

        let mut summary = RunSummary::default();
        for (position, id) in selected.iter().copied().enumerate() {
            if self.cancel.is_cancelled() {
                summary.skipped = selected.len() - position;
                info!(
                    remaining = summary.skipped,
                    "Stop requested, leaving remaining tasks queued"
                );
                self.emit(QueueEvent::Cancelled {
                    remaining: summary.skipped,
                });
                break;
            }

            let Some(task) = store.get_by_id(id).cloned() else {
                continue;
            };

            self.emit(QueueEvent::Started {
                id,
                locator: task.locator().to_string(),
                title: task.title().to_string(),
            });

            let result = self
                .pipeline
                .process_with_steps(
                    &task,
                    &target.destination,
                    target.use_uploader_subfolder,
                    &|step| {
                        self.emit(match step {
                            PipelineStep::Downloaded { path } => {
                                QueueEvent::Downloaded { id, path }
                            }
                            PipelineStep::Merged { path } => QueueEvent::Merged { id, path },
                        })
                    },
                )
                .await;

            // Removed on success and on failure alike; no automatic requeue.
            store.remove_id(id);

            match result {
                Ok(outcome) => {
                    info!("Download and merge completed: {}", outcome.merged_path.display());
                    self.emit(QueueEvent::Completed {
                        id,
                        locator: task.locator().to_string(),
                        path: outcome.merged_path.clone(),
                        dynamic_range: outcome.dynamic_range.clone(),
                    });
                    summary.completed.push(CompletedItem {
                        locator: task.locator().to_string(),
                        title: task.title().to_string(),
                        merged_path: outcome.merged_path,
                        dynamic_range: outcome.dynamic_range,
                    });
                }
                Err(e) => {
                    if e.is_item_scoped() {
                        warn!("Failed to download: {} {}", task.locator(), e);
                    } else {
                        error!("Failed to download: {} {}", task.locator(), e);
                    }
                    self.emit(QueueEvent::Failed {
                        id,
                        locator: task.locator().to_string(),
                        error: e.to_string(),
                    });
                    summary.failed.push(FailedItem {
                        locator: task.locator().to_string(),
                        title: task.title().to_string(),
                        error: e.to_string(),
                    });
                }
            }

            tokio::task::yield_now().await;
        }

        info!(
            completed = summary.completed.len(),
            failed = summary.failed.len(),
            "Queue run finished"
        );
        self.emit(QueueEvent::Finished {
            completed: summary.completed.len(),
            failed: summary.failed.len(),
        });
        summary
    }

    /// Run every task currently in the store.
    pub async fn run_all(&self, store: &mut TaskStore, target: &RunTarget) -> RunSummary {
        let indices: Vec<usize> = (1..=store.len()).collect();
        self.run(store, &indices, target).await
    }
}
