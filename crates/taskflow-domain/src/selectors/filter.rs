//! Task filtering.
//!
//! Filters are small predicates over a single task. They compose with
//! [`CompositeFilter`] (AND) and are applied with [`filter_tasks`].

use crate::{CustomFieldValue, Task, TaskPriority, TaskStatus};
use std::collections::HashSet;

/// Trait for filtering tasks by various criteria.
pub trait TaskFilter {
    /// Returns true if the task matches the filter criteria.
    fn matches(&self, task: &Task) -> bool;
}

/// Tasks whose priority is any of the given values.
pub struct PriorityFilter {
    priorities: HashSet<TaskPriority>,
}

impl PriorityFilter {
    pub fn any_of(priorities: impl IntoIterator<Item = TaskPriority>) -> Self {
        Self {
            priorities: priorities.into_iter().collect(),
        }
    }

    pub fn only(priority: TaskPriority) -> Self {
        Self::any_of(std::iter::once(priority))
    }
}

impl TaskFilter for PriorityFilter {
    fn matches(&self, task: &Task) -> bool {
        self.priorities.contains(&task.priority)
    }
}

/// Tasks whose status is any of the given values.
pub struct StatusFilter {
    statuses: HashSet<TaskStatus>,
}

impl StatusFilter {
    pub fn any_of(statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
        }
    }

    pub fn only(status: TaskStatus) -> Self {
        Self::any_of(std::iter::once(status))
    }

    /// Everything not yet completed.
    pub fn open() -> Self {
        Self::any_of([TaskStatus::NotStarted, TaskStatus::InProgress])
    }
}

impl TaskFilter for StatusFilter {
    fn matches(&self, task: &Task) -> bool {
        self.statuses.contains(&task.status)
    }
}

/// Case-insensitive substring match on title or description.
pub struct TextFilter {
    needle: String,
}

impl TextFilter {
    pub fn new(query: &str) -> Self {
        Self {
            needle: query.trim().to_lowercase(),
        }
    }
}

impl TaskFilter for TextFilter {
    fn matches(&self, task: &Task) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        task.title.to_lowercase().contains(&self.needle)
            || task
                .description
                .as_ref()
                .is_some_and(|d| d.to_lowercase().contains(&self.needle))
    }
}

/// Tasks carrying a custom field, optionally with a specific value.
pub struct CustomFieldFilter {
    key: String,
    value: Option<CustomFieldValue>,
}

impl CustomFieldFilter {
    pub fn has(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    pub fn equals(key: impl Into<String>, value: CustomFieldValue) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
        }
    }
}

impl TaskFilter for CustomFieldFilter {
    fn matches(&self, task: &Task) -> bool {
        match (task.custom_fields.get(&self.key), &self.value) {
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
            (None, _) => false,
        }
    }
}

/// Combine multiple filters with AND logic.
#[derive(Default)]
pub struct CompositeFilter {
    filters: Vec<Box<dyn TaskFilter>>,
}

impl CompositeFilter {
    /// An empty composite matches every task.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl TaskFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl TaskFilter for CompositeFilter {
    fn matches(&self, task: &Task) -> bool {
        self.filters.iter().all(|f| f.matches(task))
    }
}

/// Tasks that pass `filter`, in their original order.
pub fn filter_tasks<'a>(tasks: &'a [Task], filter: &dyn TaskFilter) -> Vec<&'a Task> {
    tasks.iter().filter(|t| filter.matches(t)).collect()
}
