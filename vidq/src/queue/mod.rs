//! Task queue: storage, user operations and sequential processing.

pub mod manager;
pub mod runner;
pub mod store;

pub use manager::{AddReport, QueueManager};
pub use runner::{CompletedItem, FailedItem, QueueEvent, QueueRunner, RunSummary, RunTarget};
pub use store::TaskStore;
