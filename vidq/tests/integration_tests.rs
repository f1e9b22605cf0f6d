//! Integration tests for the vidq queue.
//!
//! Collaborators are in-process fakes that write real files into a
//! temporary directory, so no network, yt-dlp or ffmpeg is needed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use vidq::domain::{
    FetchResult, ItemMetadata, NON_HDR, PlaylistEntry, StreamDescriptor, TaskDraft,
};
use vidq::fetch::{FetchRequest, Fetcher};
use vidq::pipeline::FetchPipeline;
use vidq::queue::{QueueManager, QueueRunner, RunTarget, TaskStore};
use vidq::remux::Remuxer;
use vidq::resolver::{LocatorExpander, LocatorKind, MetadataResolver, ResolveMode};
use vidq::{Error, Result};

/// Resolver answering from fixed tables.
#[derive(Default)]
struct TableResolver {
    items: HashMap<String, ItemMetadata>,
    playlists: HashMap<String, Vec<PlaylistEntry>>,
}

#[async_trait]
impl MetadataResolver for TableResolver {
    async fn resolve(&self, locator: &str, mode: ResolveMode) -> Result<ItemMetadata> {
        let found = match mode {
            ResolveMode::Full => self.items.get(locator).cloned(),
            ResolveMode::Flat => self
                .playlists
                .get(locator)
                .map(|entries| ItemMetadata::default().with_entries(entries.clone())),
        };
        found.ok_or_else(|| Error::resolution(locator, "not found"))
    }
}

/// Phase of a collaborator call, with wall-clock bounds.
#[derive(Debug, Clone)]
struct Span {
    locator: String,
    phase: &'static str,
    start: Instant,
    end: Instant,
}

type Timeline = Arc<Mutex<Vec<Span>>>;

/// Writes `<locator>.mp4` into the output directory after a short delay.
///
/// Locators starting with `fail-fetch` fail.
struct RecordingFetcher {
    timeline: Timeline,
    delay: Duration,
    metadata: ItemMetadata,
}

#[async_trait]
impl Fetcher for RecordingFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult> {
        let start = Instant::now();
        tokio::time::sleep(self.delay).await;

        let result = if request.locator.starts_with("fail-fetch") {
            Err(Error::fetch(&request.locator, "HTTP Error 403: Forbidden"))
        } else {
            let dir = request
                .output_template
                .parent()
                .expect("template has a directory");
            let path = dir.join(format!("{}.mp4", request.locator));
            std::fs::write(&path, request.locator.as_bytes()).expect("write download");
            Ok(FetchResult {
                downloaded_path: path,
                metadata: self.metadata.clone(),
            })
        };

        self.timeline.lock().push(Span {
            locator: request.locator.clone(),
            phase: "fetch",
            start,
            end: Instant::now(),
        });
        result
    }
}

/// Copies input to output after a short delay.
///
/// Inputs whose name starts with `fail-remux` leave a partial output and fail.
struct RecordingRemuxer {
    timeline: Timeline,
    delay: Duration,
}

#[async_trait]
impl Remuxer for RecordingRemuxer {
    async fn remux(&self, input: &Path, output: &Path) -> Result<()> {
        let start = Instant::now();
        tokio::time::sleep(self.delay).await;

        let name = input.file_stem().unwrap().to_string_lossy().to_string();
        let result = if name.starts_with("fail-remux") {
            std::fs::write(output, b"partial").expect("write partial");
            Err(Error::remux(output, 1, "Invalid data found when processing input"))
        } else {
            std::fs::copy(input, output).expect("copy");
            Ok(())
        };

        self.timeline.lock().push(Span {
            locator: name,
            phase: "remux",
            start,
            end: Instant::now(),
        });
        result
    }
}

fn hdr_stream(label: &str) -> StreamDescriptor {
    StreamDescriptor {
        format_id: "337".to_string(),
        ext: Some("webm".to_string()),
        vcodec: Some("vp09.02.51.10".to_string()),
        acodec: Some("none".to_string()),
        dynamic_range: Some(label.to_string()),
    }
}

fn pipeline(timeline: &Timeline, metadata: ItemMetadata) -> Arc<FetchPipeline> {
    Arc::new(FetchPipeline::new(
        Arc::new(RecordingFetcher {
            timeline: timeline.clone(),
            delay: Duration::from_millis(10),
            metadata,
        }),
        Arc::new(RecordingRemuxer {
            timeline: timeline.clone(),
            delay: Duration::from_millis(10),
        }),
    ))
}

fn store_with(locators: &[&str]) -> TaskStore {
    let mut store = TaskStore::new();
    for locator in locators {
        store.append(TaskDraft::new(
            *locator,
            Some(locator.to_string()),
            Some("Alice".to_string()),
            NON_HDR,
        ));
    }
    store
}

mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_resolves_stream_dynamic_range() {
        let mut resolver = TableResolver::default();
        resolver.items.insert(
            "X".to_string(),
            ItemMetadata::new("Clip", "Alice").with_stream(hdr_stream("HDR10")),
        );
        let mut manager = QueueManager::new(Arc::new(resolver));

        manager.add("X", LocatorKind::Single).await.unwrap();

        let tasks = manager.store().snapshot();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].index(), 1);
        assert_eq!(tasks[0].title(), "Clip");
        assert_eq!(tasks[0].uploader(), "Alice");
        assert_eq!(tasks[0].dynamic_range(), "HDR10");
    }

    #[tokio::test]
    async fn test_playlist_expansion_skips_entries_without_id() {
        let mut resolver = TableResolver::default();
        resolver.playlists.insert(
            "https://www.youtube.com/playlist?list=PL1".to_string(),
            vec![
                PlaylistEntry {
                    id: Some("a1".to_string()),
                    ..Default::default()
                },
                PlaylistEntry {
                    title: Some("[Private video]".to_string()),
                    ..Default::default()
                },
                PlaylistEntry {
                    id: Some("a2".to_string()),
                    ..Default::default()
                },
            ],
        );
        let expander = LocatorExpander::new(Arc::new(resolver));

        let items = expander
            .expand("https://www.youtube.com/playlist?list=PL1", LocatorKind::Playlist)
            .await
            .unwrap();

        assert_eq!(
            items,
            vec![
                "https://www.youtube.com/watch?v=a1",
                "https://www.youtube.com/watch?v=a2",
            ]
        );
    }

    #[test]
    fn test_remove_middle_task_reindexes() {
        let mut store = store_with(&["first", "second", "third"]);

        store.remove([2]);

        let tasks = store.snapshot();
        let view: Vec<(usize, &str)> = tasks.iter().map(|t| (t.index(), t.locator())).collect();
        assert_eq!(view, vec![(1, "first"), (2, "third")]);
    }

    #[tokio::test]
    async fn test_merge_replaces_stale_output() {
        let temp_dir = TempDir::new().unwrap();
        let stale = temp_dir.path().join("clip.mkv");
        std::fs::write(&stale, b"stale").unwrap();

        let timeline = Timeline::default();
        let pipeline = pipeline(&timeline, ItemMetadata::new("clip", "Alice"));
        let task = store_with(&["clip"]).snapshot().remove(0);

        let outcome = pipeline.process(&task, temp_dir.path(), false).await.unwrap();

        assert_eq!(outcome.merged_path, stale);
        assert_eq!(std::fs::read(&stale).unwrap(), b"clip");
        assert!(!temp_dir.path().join("clip.mkv.tmp.mkv").exists());
        assert_eq!(outcome.dynamic_range, NON_HDR);
    }
}

mod runner_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_items_never_overlap() {
        let temp_dir = TempDir::new().unwrap();
        let timeline = Timeline::default();
        let runner = QueueRunner::new(pipeline(&timeline, ItemMetadata::default()));
        let mut store = store_with(&["a", "b", "fail-fetch-c", "d", "fail-remux-e", "f"]);

        let summary = runner
            .run_all(&mut store, &RunTarget::new(temp_dir.path(), false))
            .await;

        assert_eq!(summary.completed.len(), 4);
        assert_eq!(summary.failed.len(), 2);
        assert!(store.is_empty());

        let spans = timeline.lock().clone();
        // Group spans per item in the order they started.
        let mut items: Vec<(String, Instant, Instant)> = Vec::new();
        for span in &spans {
            match items.last_mut() {
                Some((locator, _, end)) if *locator == span.locator => *end = span.end,
                _ => items.push((span.locator.clone(), span.start, span.end)),
            }
        }

        let order: Vec<&str> = items.iter().map(|(l, _, _)| l.as_str()).collect();
        assert_eq!(
            order,
            vec!["a", "b", "fail-fetch-c", "d", "fail-remux-e", "f"]
        );
        for pair in items.windows(2) {
            let (previous, _, previous_end) = &pair[0];
            let (next, next_start, _) = &pair[1];
            assert!(
                previous_end <= next_start,
                "{} started before {} returned",
                next,
                previous
            );
        }
        assert!(spans.iter().all(|s| s.start <= s.end));
        assert_eq!(spans.iter().filter(|s| s.phase == "remux").count(), 5);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_the_run() {
        let temp_dir = TempDir::new().unwrap();
        let timeline = Timeline::default();
        let runner = QueueRunner::new(pipeline(&timeline, ItemMetadata::default()));
        let mut store = store_with(&["fail-fetch-a", "b"]);

        let summary = runner
            .run_all(&mut store, &RunTarget::new(temp_dir.path(), false))
            .await;

        assert_eq!(summary.failed[0].locator, "fail-fetch-a");
        assert!(summary.failed[0].error.contains("fail-fetch-a"));
        assert_eq!(summary.completed[0].merged_path, temp_dir.path().join("b.mkv"));
    }

    #[tokio::test]
    async fn test_selection_survives_reindexing() {
        let temp_dir = TempDir::new().unwrap();
        let timeline = Timeline::default();
        let runner = QueueRunner::new(pipeline(&timeline, ItemMetadata::default()));
        let mut store = store_with(&["a", "b", "c", "d"]);

        // After "a" is removed, "d" moves to index 3; the run must still pick "d".
        let summary = runner
            .run(&mut store, &[1, 4], &RunTarget::new(temp_dir.path(), false))
            .await;

        let done: Vec<&str> = summary.completed.iter().map(|c| c.locator.as_str()).collect();
        assert_eq!(done, vec!["a", "d"]);
        let left: Vec<(usize, String)> = store
            .iter()
            .map(|t| (t.index(), t.locator().to_string()))
            .collect();
        assert_eq!(left, vec![(1, "b".to_string()), (2, "c".to_string())]);
    }

    #[tokio::test]
    async fn test_uploader_subfolder() {
        let temp_dir = TempDir::new().unwrap();
        let timeline = Timeline::default();
        let runner = QueueRunner::new(pipeline(&timeline, ItemMetadata::default()));
        let mut store = store_with(&["clip"]);

        let summary = runner
            .run_all(&mut store, &RunTarget::new(temp_dir.path(), true))
            .await;

        let expected: PathBuf = temp_dir.path().join("Alice").join("clip.mkv");
        assert_eq!(summary.completed[0].merged_path, expected);
        assert!(expected.is_file());
    }
}

mod merge_property_tests {
    use super::*;

    #[tokio::test]
    async fn test_success_leaves_exactly_the_merged_file() {
        let temp_dir = TempDir::new().unwrap();
        let timeline = Timeline::default();
        let pipeline = pipeline(&timeline, ItemMetadata::default().with_dynamic_range("HLG"));

        for round in 0..3 {
            let task = store_with(&["clip"]).snapshot().remove(0);
            let outcome = pipeline.process(&task, temp_dir.path(), false).await.unwrap();

            let mkv_files: Vec<PathBuf> = std::fs::read_dir(temp_dir.path())
                .unwrap()
                .map(|e| e.unwrap().path())
                .filter(|p| p.to_string_lossy().contains(".mkv"))
                .collect();
            assert_eq!(mkv_files, vec![outcome.merged_path.clone()], "round {}", round);
            assert_eq!(outcome.dynamic_range, "HLG");
        }
    }

    #[tokio::test]
    async fn test_failed_remux_keeps_previous_output() {
        let temp_dir = TempDir::new().unwrap();
        let merged = temp_dir.path().join("fail-remux-clip.mkv");
        std::fs::write(&merged, b"previous").unwrap();

        let timeline = Timeline::default();
        let pipeline = pipeline(&timeline, ItemMetadata::default());
        let task = store_with(&["fail-remux-clip"]).snapshot().remove(0);

        let err = pipeline.process(&task, temp_dir.path(), false).await.unwrap_err();

        assert!(matches!(err, Error::RemuxFailed { code: 1, .. }));
        assert_eq!(std::fs::read(&merged).unwrap(), b"previous");
        assert!(!temp_dir.path().join("fail-remux-clip.mkv.tmp.mkv").exists());
    }
}
