//! Queued download tasks.

use std::fmt;

/// Dynamic-range label used when neither the item nor its streams report one.
pub const NON_HDR: &str = "non-HDR";

/// Title shown when the resolver did not report one.
pub const UNKNOWN_TITLE: &str = "No title";

/// Uploader shown when the resolver did not report one.
pub const UNKNOWN_UPLOADER: &str = "Unknown uploader";

/// Stable identity of a task inside a store.
///
/// Unlike [`Task::index`], the id never changes when other tasks are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One queued unit of work.
///
/// Fields are only mutated by [`TaskStore`](crate::queue::TaskStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) index: usize,
    pub(crate) locator: String,
    pub(crate) title: String,
    pub(crate) uploader: String,
    pub(crate) dynamic_range: String,
}

impl Task {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Dense 1-based display position.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn uploader(&self) -> &str {
        &self.uploader
    }

    pub fn dynamic_range(&self) -> &str {
        &self.dynamic_range
    }

    /// The uploader, unless it is empty or the unresolved placeholder.
    pub fn known_uploader(&self) -> Option<&str> {
        let uploader = self.uploader.trim();
        (!uploader.is_empty() && uploader != UNKNOWN_UPLOADER).then_some(uploader)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3}  {}  [{}]  {}  ({})",
            self.index, self.title, self.dynamic_range, self.uploader, self.locator
        )
    }
}

/// Resolved fields for a new or edited task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub locator: String,
    pub title: String,
    pub uploader: String,
    pub dynamic_range: String,
}

impl TaskDraft {
    /// Build a draft, substituting placeholders for missing values.
    pub fn new(
        locator: impl Into<String>,
        title: Option<String>,
        uploader: Option<String>,
        dynamic_range: impl Into<String>,
    ) -> Self {
        Self {
            locator: locator.into(),
            title: non_empty(title).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            uploader: non_empty(uploader).unwrap_or_else(|| UNKNOWN_UPLOADER.to_string()),
            dynamic_range: dynamic_range.into(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
