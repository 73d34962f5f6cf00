//! Task sorting.
//!
//! Used by list views and by the CLI report so both order tasks the same way.

use crate::Task;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;

/// Enum dispatch for sorting tasks by a specific field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Title,
    Priority,
    Status,
    Position,
    StatusPosition,
    CreatedAt,
    UpdatedAt,
}

impl SortBy {
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        match self {
            Self::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            Self::Priority => a.priority.cmp(&b.priority),
            Self::Status => a.status.cmp(&b.status),
            Self::Position => a.position.cmp(&b.position),
            Self::StatusPosition => a.status_position.cmp(&b.status_position),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Applies a sort order to a sort field. Ties keep their input order.
pub struct OrderedSorter {
    sorter: SortBy,
    order: SortOrder,
}

impl OrderedSorter {
    pub fn new(sorter: SortBy, order: SortOrder) -> Self {
        Self { sorter, order }
    }

    /// Sort a slice in place. Works with both `&Task` and `Task` elements.
    pub fn sort_by<T: Borrow<Task>>(&self, tasks: &mut [T]) {
        tasks.sort_by(|a, b| {
            let cmp = self.sorter.compare(a.borrow(), b.borrow());
            match self.order {
                SortOrder::Ascending => cmp,
                SortOrder::Descending => cmp.reverse(),
            }
        });
    }
}
