//! Derived views over a project's tasks.
//!
//! Pure functions only; nothing here mutates the store.

pub mod filter;
pub mod sort;

pub use filter::{
    filter_tasks, CompositeFilter, CustomFieldFilter, PriorityFilter, StatusFilter, TaskFilter,
    TextFilter,
};
pub use sort::{OrderedSorter, SortBy, SortOrder};

use crate::positions::{column_indices, ColumnKey};
use crate::{Task, TaskPriority, TaskStatus};
use serde::Serialize;

/// Tasks of one priority column in display order.
pub fn priority_column(tasks: &[Task], priority: TaskPriority) -> Vec<&Task> {
    column(tasks, ColumnKey::Priority(priority))
}

/// Tasks of one status column in display order.
pub fn status_column(tasks: &[Task], status: TaskStatus) -> Vec<&Task> {
    column(tasks, ColumnKey::Status(status))
}

pub fn column(tasks: &[Task], key: ColumnKey) -> Vec<&Task> {
    column_indices(tasks, key)
        .into_iter()
        .map(|i| &tasks[i])
        .collect()
}

/// One column of a board projection.
#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn<'a> {
    pub key: ColumnKey,
    pub tasks: Vec<&'a Task>,
}

impl BoardColumn<'_> {
    pub fn titles(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.title.as_str()).collect()
    }
}

/// Every priority column, most urgent first, including empty ones.
pub fn board_by_priority(tasks: &[Task]) -> Vec<BoardColumn<'_>> {
    TaskPriority::ALL
        .iter()
        .rev()
        .map(|&priority| BoardColumn {
            key: ColumnKey::Priority(priority),
            tasks: priority_column(tasks, priority),
        })
        .collect()
}

/// Every status column in workflow order, including empty ones.
pub fn board_by_status(tasks: &[Task]) -> Vec<BoardColumn<'_>> {
    TaskStatus::ALL
        .iter()
        .map(|&status| BoardColumn {
            key: ColumnKey::Status(status),
            tasks: status_column(tasks, status),
        })
        .collect()
}
