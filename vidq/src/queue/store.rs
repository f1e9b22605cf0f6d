//! Ordered, densely indexed task storage.

use std::collections::HashSet;

use crate::domain::{Task, TaskDraft, TaskId};
use crate::{Error, Result};

/// Holds the queued tasks in display order.
///
/// Indices are always exactly `1..=len()`; every removal reindexes the
/// remainder. [`TaskId`]s are never reused within one store.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    next_id: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Insert at the end with the next sequential index.
    pub fn append(&mut self, draft: TaskDraft) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.tasks.push(Task {
            id,
            index: self.tasks.len() + 1,
            locator: draft.locator,
            title: draft.title,
            uploader: draft.uploader,
            dynamic_range: draft.dynamic_range,
        });
        id
    }

    /// Overwrite the task at `index` in place, keeping its position and id.
    pub fn replace(&mut self, index: usize, draft: TaskDraft) -> Result<()> {
        let task = self
            .get_mut(index)
            .ok_or_else(|| Error::not_found("Task", index.to_string()))?;
        task.locator = draft.locator;
        task.title = draft.title;
        task.uploader = draft.uploader;
        task.dynamic_range = draft.dynamic_range;
        Ok(())
    }

    /// Remove every task whose index is in `indices`; unknown indices are ignored.
    ///
    /// Returns how many tasks were removed.
    pub fn remove<I>(&mut self, indices: I) -> usize
    where
        I: IntoIterator<Item = usize>,
    {
        let doomed: HashSet<usize> = indices.into_iter().collect();
        let before = self.tasks.len();
        self.tasks.retain(|task| !doomed.contains(&task.index));
        let removed = before - self.tasks.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    /// Remove a task by id, returning it.
    pub fn remove_id(&mut self, id: TaskId) -> Option<Task> {
        let position = self.tasks.iter().position(|task| task.id == id)?;
        let task = self.tasks.remove(position);
        self.reindex();
        Some(task)
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        index
            .checked_sub(1)
            .and_then(|position| self.tasks.get(position))
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut Task> {
        index
            .checked_sub(1)
            .and_then(|position| self.tasks.get_mut(position))
    }

    pub fn get_by_id(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn id_for_index(&self, index: usize) -> Option<TaskId> {
        self.get(index).map(Task::id)
    }

    /// Copy of the current contents in display order.
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    fn reindex(&mut self) {
        for (position, task) in self.tasks.iter_mut().enumerate() {
            task.index = position + 1;
        }
    }
}
