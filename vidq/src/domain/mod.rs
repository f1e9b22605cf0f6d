//! Domain types shared by the queue and the pipeline.

pub mod media;
pub mod task;

pub use media::{FetchResult, ItemMetadata, PlaylistEntry, StreamDescriptor};
pub use task::{NON_HDR, Task, TaskDraft, TaskId, UNKNOWN_TITLE, UNKNOWN_UPLOADER};
