//! Column position bookkeeping.
//!
//! Pure functions over task slices that encode how `position` (priority
//! columns) and `status_position` (status columns) are assigned. Positions
//! may have gaps; only their relative order is meaningful.

use crate::{Task, TaskPriority, TaskStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One board column: the tasks sharing a priority, or sharing a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "axis", content = "value", rename_all = "lowercase")]
pub enum ColumnKey {
    Priority(TaskPriority),
    Status(TaskStatus),
}

impl ColumnKey {
    pub fn of_priority(task: &Task) -> Self {
        Self::Priority(task.priority)
    }

    pub fn of_status(task: &Task) -> Self {
        Self::Status(task.status)
    }

    /// The column `task` currently sits in on the same axis as `self`.
    pub fn same_axis_for(&self, task: &Task) -> Self {
        match self {
            Self::Priority(_) => Self::of_priority(task),
            Self::Status(_) => Self::of_status(task),
        }
    }

    pub fn contains(&self, task: &Task) -> bool {
        match self {
            Self::Priority(priority) => task.priority == *priority,
            Self::Status(status) => task.status == *status,
        }
    }

    /// The ordering key of `task` along this column's axis.
    pub fn position_of(&self, task: &Task) -> i64 {
        match self {
            Self::Priority(_) => task.position,
            Self::Status(_) => task.status_position,
        }
    }

    pub fn set_position(&self, task: &mut Task, position: i64) {
        match self {
            Self::Priority(_) => task.position = position,
            Self::Status(_) => task.status_position = position,
        }
    }

    /// Move `task` into this column without touching its position.
    pub fn assign(&self, task: &mut Task) {
        match self {
            Self::Priority(priority) => task.priority = *priority,
            Self::Status(status) => task.status = *status,
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Priority(priority) => write!(f, "priority:{}", priority),
            Self::Status(status) => write!(f, "status:{}", status),
        }
    }
}

/// Append position for a column: one past the current maximum, or 0 when empty.
///
/// Scoped to `project_id` so a shared slice never leaks ordering across projects.
pub fn next_position(tasks: &[Task], project_id: &str, column: ColumnKey) -> i64 {
    tasks
        .iter()
        .filter(|t| t.project_id == project_id && column.contains(t))
        .map(|t| column.position_of(t))
        .max()
        .map_or(0, |max| max + 1)
}

/// Indices of the tasks in `column`, ordered by their position on that axis.
///
/// Ties fall back to creation time and then id so the order is total.
pub fn column_indices(tasks: &[Task], column: ColumnKey) -> Vec<usize> {
    let mut indices: Vec<usize> = tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| column.contains(t))
        .map(|(i, _)| i)
        .collect();

    indices.sort_by(|&a, &b| {
        let (ta, tb) = (&tasks[a], &tasks[b]);
        column
            .position_of(ta)
            .cmp(&column.position_of(tb))
            .then_with(|| ta.created_at.cmp(&tb.created_at))
            .then_with(|| ta.id.cmp(&tb.id))
    });
    indices
}

/// Task ids of `column` in display order.
pub fn column_order(tasks: &[Task], column: ColumnKey) -> Vec<String> {
    column_indices(tasks, column)
        .into_iter()
        .map(|i| tasks[i].id.clone())
        .collect()
}

/// Zero-based rank of a task within its column, if it is in that column.
pub fn rank_in_column(tasks: &[Task], column: ColumnKey, task_id: &str) -> Option<usize> {
    column_indices(tasks, column)
        .into_iter()
        .position(|i| tasks[i].id == task_id)
}

/// Place the task at `index` into `column` at `destination_index`.
///
/// The task takes the position of whichever task currently occupies the
/// destination rank, and that task and every later one shift up by one.
/// Without a destination (or past the end) the task is appended. Returns the
/// indices of siblings whose position was shifted.
pub fn insert_into_column(
    tasks: &mut [Task],
    index: usize,
    column: ColumnKey,
    destination_index: Option<usize>,
) -> Vec<usize> {
    let moving_id = tasks[index].id.clone();
    let project_id = tasks[index].project_id.clone();

    let siblings: Vec<usize> = column_indices(tasks, column)
        .into_iter()
        .filter(|&i| tasks[i].id != moving_id && tasks[i].project_id == project_id)
        .collect();

    let target = destination_index
        .and_then(|dest| siblings.get(dest).copied())
        .map(|i| column.position_of(&tasks[i]));

    let mut shifted = Vec::new();
    let new_position = match target {
        Some(target) => {
            for &i in &siblings {
                let current = column.position_of(&tasks[i]);
                if current >= target {
                    column.set_position(&mut tasks[i], current + 1);
                    shifted.push(i);
                }
            }
            target
        }
        None => siblings
            .iter()
            .map(|&i| column.position_of(&tasks[i]))
            .max()
            .map_or(0, |max| max + 1),
    };

    column.assign(&mut tasks[index]);
    column.set_position(&mut tasks[index], new_position);
    shifted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, priority: TaskPriority, position: i64) -> Task {
        let mut task = Task::new("p1", title).with_priority(priority);
        task.position = position;
        task
    }

    fn titles(tasks: &[Task], column: ColumnKey) -> Vec<String> {
        column_indices(tasks, column)
            .into_iter()
            .map(|i| tasks[i].title.clone())
            .collect()
    }

    #[test]
    fn next_position_empty_column_is_zero() {
        let tasks = vec![task("A", TaskPriority::Low, 4)];
        assert_eq!(next_position(&tasks, "p1", ColumnKey::Priority(TaskPriority::High)), 0);
    }

    #[test]
    fn next_position_is_max_plus_one_with_gaps() {
        let tasks = vec![
            task("A", TaskPriority::Low, 0),
            task("B", TaskPriority::Low, 9),
            task("C", TaskPriority::Low, 3),
        ];
        assert_eq!(next_position(&tasks, "p1", ColumnKey::Priority(TaskPriority::Low)), 10);
    }

    #[test]
    fn next_position_ignores_other_projects() {
        let mut other = task("X", TaskPriority::Low, 50);
        other.project_id = "p2".to_string();
        let tasks = vec![task("A", TaskPriority::Low, 1), other];
        assert_eq!(next_position(&tasks, "p1", ColumnKey::Priority(TaskPriority::Low)), 2);
    }

    #[test]
    fn column_order_sorts_by_axis_position() {
        let mut tasks = vec![
            task("A", TaskPriority::High, 2),
            task("B", TaskPriority::High, 0),
            task("C", TaskPriority::Low, 1),
        ];
        tasks[0].status_position = 0;
        tasks[1].status_position = 5;
        tasks[2].status_position = 1;

        assert_eq!(titles(&tasks, ColumnKey::Priority(TaskPriority::High)), ["B", "A"]);
        assert_eq!(titles(&tasks, ColumnKey::Status(TaskStatus::NotStarted)), ["A", "C", "B"]);
    }

    #[test]
    fn insert_shifts_later_siblings() {
        let mut tasks = vec![
            task("A", TaskPriority::High, 0),
            task("B", TaskPriority::High, 1),
            task("C", TaskPriority::High, 2),
            task("D", TaskPriority::Low, 0),
        ];

        let shifted = insert_into_column(&mut tasks, 3, ColumnKey::Priority(TaskPriority::High), Some(1));

        assert_eq!(shifted.len(), 2);
        assert_eq!(tasks[3].priority, TaskPriority::High);
        assert_eq!(titles(&tasks, ColumnKey::Priority(TaskPriority::High)), ["A", "D", "B", "C"]);
        assert_eq!(tasks[0].position, 0);
    }

    #[test]
    fn insert_without_destination_appends() {
        let mut tasks = vec![task("A", TaskPriority::High, 4), task("D", TaskPriority::Low, 0)];

        let shifted = insert_into_column(&mut tasks, 1, ColumnKey::Priority(TaskPriority::High), None);

        assert!(shifted.is_empty());
        assert_eq!(tasks[1].position, 5);
    }

    #[test]
    fn insert_past_end_appends() {
        let mut tasks = vec![task("A", TaskPriority::High, 0), task("D", TaskPriority::Low, 0)];
        insert_into_column(&mut tasks, 1, ColumnKey::Priority(TaskPriority::High), Some(10));
        assert_eq!(titles(&tasks, ColumnKey::Priority(TaskPriority::High)), ["A", "D"]);
    }

    #[test]
    fn insert_within_same_column_reorders() {
        let mut tasks = vec![
            task("A", TaskPriority::High, 0),
            task("B", TaskPriority::High, 1),
            task("C", TaskPriority::High, 2),
        ];

        insert_into_column(&mut tasks, 2, ColumnKey::Priority(TaskPriority::High), Some(0));
        assert_eq!(titles(&tasks, ColumnKey::Priority(TaskPriority::High)), ["C", "A", "B"]);
    }

    #[test]
    fn rank_in_column_reports_index() {
        let tasks = vec![task("A", TaskPriority::High, 3), task("B", TaskPriority::High, 1)];
        let id = tasks[0].id.clone();
        assert_eq!(rank_in_column(&tasks, ColumnKey::Priority(TaskPriority::High), &id), Some(1));
        assert_eq!(rank_in_column(&tasks, ColumnKey::Priority(TaskPriority::Low), &id), None);
    }
}
