//! User-facing queue operations.
//!
//! [`QueueManager`] owns the [`TaskStore`] and is the only place tasks are
//! created or edited: every add and edit goes through a full metadata
//! resolution first, so a task in the store always carries resolved
//! (or placeholder) display fields.

use std::sync::Arc;

use tracing::{info, warn};

use super::TaskStore;
use crate::domain::{TaskDraft, TaskId};
use crate::resolver::{LocatorExpander, LocatorKind, MetadataResolver, ResolveMode};
use crate::selector::StreamSelector;
use crate::{Error, Result};

/// Result of an add operation that may cover several locators.
#[derive(Debug, Default)]
pub struct AddReport {
    pub added: Vec<TaskId>,
    /// Locators that could not be expanded or resolved, with the reason.
    pub failed: Vec<(String, Error)>,
}

impl AddReport {
    fn merge(&mut self, other: AddReport) {
        self.added.extend(other.added);
        self.failed.extend(other.failed);
    }
}

/// Queue operations backed by a resolver.
pub struct QueueManager {
    store: TaskStore,
    resolver: Arc<dyn MetadataResolver>,
    expander: LocatorExpander,
    selector: StreamSelector,
}

impl QueueManager {
    /// Create a manager with the default playlist item template.
    pub fn new(resolver: Arc<dyn MetadataResolver>) -> Self {
        let expander = LocatorExpander::new(resolver.clone());
        Self::with_expander(resolver, expander)
    }

    pub fn with_expander(resolver: Arc<dyn MetadataResolver>, expander: LocatorExpander) -> Self {
        Self {
            store: TaskStore::new(),
            resolver,
            expander,
            selector: StreamSelector::new(),
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore {
        &mut self.store
    }

    /// Resolve a single item locator into task fields.
    pub async fn resolve_draft(&self, locator: &str) -> Result<TaskDraft> {
        let metadata = self.resolver.resolve(locator, ResolveMode::Full).await?;
        let selection = self.selector.select(&metadata);
        Ok(TaskDraft::new(
            locator,
            metadata.title.clone(),
            metadata.uploader.clone(),
            selection.dynamic_range,
        ))
    }

    /// Resolve and append one item locator.
    pub async fn add_item(&mut self, locator: &str) -> Result<TaskId> {
        let draft = self.resolve_draft(locator).await?;
        info!(
            locator = %locator,
            title = %draft.title,
            dynamic_range = %draft.dynamic_range,
            "Added task"
        );
        Ok(self.store.append(draft))
    }

    /// Expand `locator` and add every resulting item.
    ///
    /// An expansion failure is returned as an error; a failure to resolve
    /// one expanded item is recorded in the report and the rest are still added.
    pub async fn add(&mut self, locator: &str, kind: LocatorKind) -> Result<AddReport> {
        let items = self.expander.expand(locator, kind).await?;
        let mut report = AddReport::default();

        for item in items {
            match self.add_item(&item).await {
                Ok(id) => report.added.push(id),
                Err(e) => {
                    warn!(locator = %item, "Failed to add: {}", e);
                    report.failed.push((item, e));
                }
            }
        }
        Ok(report)
    }

    /// Add every whitespace-separated locator in `text`, in order.
    pub async fn add_many(&mut self, text: &str, kind: LocatorKind) -> AddReport {
        let mut report = AddReport::default();
        for locator in text.split_whitespace() {
            match self.add(locator, kind).await {
                Ok(added) => report.merge(added),
                Err(e) => {
                    warn!(locator = %locator, "Failed to expand: {}", e);
                    report.failed.push((locator.to_string(), e));
                }
            }
        }
        report
    }

    /// Point the task at `index` to a new locator and re-resolve its fields.
    ///
    /// For a playlist locator the first expanded item is used. The task is
    /// left untouched when anything fails.
    pub async fn edit(&mut self, index: usize, locator: &str, kind: LocatorKind) -> Result<()> {
        if self.store.get(index).is_none() {
            return Err(Error::not_found("Task", index.to_string()));
        }

        let item = self
            .expander
            .expand(locator, kind)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::resolution(locator, "playlist has no items"))?;

        let draft = self.resolve_draft(&item).await?;
        self.store.replace(index, draft)?;
        info!(index, locator = %item, "Edited task");
        Ok(())
    }

    /// Remove the given indices; unknown indices are ignored.
    pub fn delete<I>(&mut self, indices: I) -> usize
    where
        I: IntoIterator<Item = usize>,
    {
        let removed = self.store.remove(indices);
        if removed > 0 {
            info!(removed, remaining = self.store.len(), "Deleted tasks");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }
}
