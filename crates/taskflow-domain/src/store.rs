//! In-memory task store for one project.
//!
//! The store holds the canonical local copy of a project's tasks and applies
//! each mutation atomically with respect to position bookkeeping. It never
//! talks to the gateway; commands call into it only after the gateway has
//! confirmed a change.
//!
//! Every mutating operation records a [`StoreMutation`] describing how to
//! reverse exactly that mutation. The descriptor is transient: the next
//! mutation overwrites it, and [`TaskStore::load_tasks`] (the non-undoable
//! initial fetch) clears it.

use crate::positions::{self, ColumnKey};
use crate::{BulkUpdate, Task, TaskId, TaskPriority, TaskStatus, TaskUpdate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use taskflow_core::Editable;

/// Explicit placement for a task being inserted. `None` means append.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskPlacement {
    pub position: Option<i64>,
    pub status_position: Option<i64>,
}

impl TaskPlacement {
    pub fn append() -> Self {
        Self::default()
    }

    /// Keep the positions already carried by `task` (e.g. server-assigned).
    pub fn from_task(task: &Task) -> Self {
        Self {
            position: Some(task.position),
            status_position: Some(task.status_position),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    Reorder(ColumnKey),
    BulkUpdate,
    Move(ColumnKey),
    Clear,
}

/// A task as it was before a mutation, with its index in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorTask {
    pub index: usize,
    pub task: Task,
}

/// Undo descriptor for the most recent store mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMutation {
    pub kind: MutationKind,
    /// Tasks that did not exist before the mutation.
    pub created: Vec<TaskId>,
    /// Prior state of every pre-existing task the mutation touched.
    pub prior: Vec<PriorTask>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    last_mutation: Option<StoreMutation>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn last_mutation(&self) -> Option<&StoreMutation> {
        self.last_mutation.as_ref()
    }

    pub fn take_last_mutation(&mut self) -> Option<StoreMutation> {
        self.last_mutation.take()
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn record(&mut self, kind: MutationKind, created: Vec<TaskId>, prior: Vec<PriorTask>) {
        self.last_mutation = Some(StoreMutation {
            kind,
            created,
            prior,
        });
    }

    fn snapshot(&self, indices: impl IntoIterator<Item = usize>) -> Vec<PriorTask> {
        indices
            .into_iter()
            .map(|index| PriorTask {
                index,
                task: self.tasks[index].clone(),
            })
            .collect()
    }

    /// Replace the contents with a freshly fetched task list.
    ///
    /// Not undoable: the undo descriptor is cleared rather than populated.
    pub fn load_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.last_mutation = None;
    }

    /// Append a task, assigning append positions where the placement leaves them open.
    ///
    /// A task with the same id is replaced; the descriptor keeps the replaced
    /// copy so a revert puts it back.
    pub fn create_task(&mut self, mut task: Task, placement: TaskPlacement) -> Task {
        let prior = match self.index_of(&task.id) {
            Some(index) => {
                tracing::warn!("Task {} already in store, replacing local copy", task.id);
                let prior = self.snapshot([index]);
                self.tasks.remove(index);
                prior
            }
            None => Vec::new(),
        };

        task.position = placement.position.unwrap_or_else(|| {
            positions::next_position(&self.tasks, &task.project_id, ColumnKey::of_priority(&task))
        });
        task.status_position = placement.status_position.unwrap_or_else(|| {
            positions::next_position(&self.tasks, &task.project_id, ColumnKey::of_status(&task))
        });

        self.tasks.push(task.clone());
        self.record(MutationKind::Create, vec![task.id.clone()], prior);
        task
    }

    /// Merge `updates` into a task.
    ///
    /// A priority (status) change without an explicit position (status
    /// position) appends the task to its new column. An unknown id is a
    /// local desync: logged and ignored.
    pub fn update_task(&mut self, id: &str, mut updates: TaskUpdate) -> Option<&Task> {
        let Some(index) = self.index_of(id) else {
            tracing::warn!("update_task: task {} not in store, ignoring", id);
            return None;
        };
        let prior = self.snapshot([index]);
        let current = &self.tasks[index];

        if let Some(priority) = updates.priority {
            if priority != current.priority && updates.position.is_none() {
                updates.position = Some(positions::next_position(
                    &self.tasks,
                    &current.project_id,
                    ColumnKey::Priority(priority),
                ));
            }
        }
        if let Some(status) = updates.status {
            if status != current.status && updates.status_position.is_none() {
                updates.status_position = Some(positions::next_position(
                    &self.tasks,
                    &current.project_id,
                    ColumnKey::Status(status),
                ));
            }
        }

        updates.apply_to(&mut self.tasks[index]);
        self.record(MutationKind::Update, Vec::new(), prior);
        self.tasks.get(index)
    }

    /// Copy server-owned metadata (version, audit fields) from `server` onto
    /// the local task. Not a mutation: the undo descriptor is left alone.
    pub fn stamp(&mut self, server: &Task) {
        if let Some(index) = self.index_of(&server.id) {
            let task = &mut self.tasks[index];
            task.version = server.version;
            task.updated_at = server.updated_at;
            task.updated_by = server.updated_by.clone();
        }
    }

    pub fn delete_task(&mut self, id: &str) -> Option<Task> {
        self.delete_tasks(&[id.to_string()]).into_iter().next()
    }

    /// Remove every listed task; ids not in the store are logged and skipped.
    pub fn delete_tasks(&mut self, ids: &[TaskId]) -> Vec<Task> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let indices: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| wanted.contains(t.id.as_str()))
            .map(|(i, _)| i)
            .collect();

        if indices.len() < wanted.len() {
            tracing::warn!(
                "delete_tasks: {} of {} tasks not in store",
                wanted.len() - indices.len(),
                wanted.len()
            );
        }
        if indices.is_empty() {
            return Vec::new();
        }

        let prior = self.snapshot(indices.iter().copied());
        for &index in indices.iter().rev() {
            self.tasks.remove(index);
        }
        let removed = prior.iter().map(|p| p.task.clone()).collect();
        self.record(MutationKind::Delete, Vec::new(), prior);
        removed
    }

    /// Assign `position = index` for each id, scoped to tasks already in the priority column.
    pub fn reorder_tasks(&mut self, priority: TaskPriority, ordered_ids: &[TaskId]) {
        self.reorder_column(ColumnKey::Priority(priority), ordered_ids);
    }

    /// Assign `status_position = index` for each id, scoped to tasks already in the status column.
    pub fn reorder_tasks_by_status(&mut self, status: TaskStatus, ordered_ids: &[TaskId]) {
        self.reorder_column(ColumnKey::Status(status), ordered_ids);
    }

    pub fn reorder_column(&mut self, column: ColumnKey, ordered_ids: &[TaskId]) {
        let mut placements = Vec::with_capacity(ordered_ids.len());
        for (rank, id) in ordered_ids.iter().enumerate() {
            match self.index_of(id) {
                Some(index) if column.contains(&self.tasks[index]) => {
                    placements.push((index, rank as i64));
                }
                Some(_) => tracing::warn!("reorder: task {} is not in column {}", id, column),
                None => tracing::warn!("reorder: task {} not in store", id),
            }
        }

        let prior = self.snapshot(placements.iter().map(|&(index, _)| index));
        for (index, position) in placements {
            let task = &mut self.tasks[index];
            column.set_position(task, position);
            task.version += 1;
            task.touch();
        }
        self.record(MutationKind::Reorder(column), Vec::new(), prior);
    }

    /// Apply the same partial update to every listed task.
    ///
    /// Tasks changing priority (status) are appended to the destination
    /// column in the order given; tasks already there keep their position.
    /// Returns the number of tasks updated.
    pub fn bulk_update(&mut self, ids: &[TaskId], updates: &BulkUpdate) -> usize {
        let indices: Vec<usize> = ids.iter().filter_map(|id| self.index_of(id)).collect();
        if indices.len() < ids.len() {
            tracing::warn!(
                "bulk_update: {} of {} tasks not in store",
                ids.len() - indices.len(),
                ids.len()
            );
        }

        let prior = self.snapshot(indices.iter().copied());
        for &index in &indices {
            let project_id = self.tasks[index].project_id.clone();
            if let Some(priority) = updates.priority {
                if self.tasks[index].priority != priority {
                    let column = ColumnKey::Priority(priority);
                    let position = positions::next_position(&self.tasks, &project_id, column);
                    let task = &mut self.tasks[index];
                    column.assign(task);
                    column.set_position(task, position);
                }
            }
            if let Some(status) = updates.status {
                if self.tasks[index].status != status {
                    let column = ColumnKey::Status(status);
                    let position = positions::next_position(&self.tasks, &project_id, column);
                    let task = &mut self.tasks[index];
                    column.assign(task);
                    column.set_position(task, position);
                }
            }
            let task = &mut self.tasks[index];
            task.version += 1;
            task.touch();
        }

        self.record(MutationKind::BulkUpdate, Vec::new(), prior);
        indices.len()
    }

    /// Move one task into a priority column, inserting at `destination_index` or appending.
    pub fn update_priority(
        &mut self,
        id: &str,
        priority: TaskPriority,
        destination_index: Option<usize>,
    ) -> Option<&Task> {
        self.move_to_column(id, ColumnKey::Priority(priority), destination_index)
    }

    /// Move one task into a status column, inserting at `destination_index` or appending.
    pub fn update_status(
        &mut self,
        id: &str,
        status: TaskStatus,
        destination_index: Option<usize>,
    ) -> Option<&Task> {
        self.move_to_column(id, ColumnKey::Status(status), destination_index)
    }

    fn move_to_column(
        &mut self,
        id: &str,
        column: ColumnKey,
        destination_index: Option<usize>,
    ) -> Option<&Task> {
        let Some(index) = self.index_of(id) else {
            tracing::warn!("move to {}: task {} not in store, ignoring", column, id);
            return None;
        };

        let before = self.tasks.clone();
        let shifted = positions::insert_into_column(&mut self.tasks, index, column, destination_index);

        let task = &mut self.tasks[index];
        task.version += 1;
        task.touch();

        let prior = std::iter::once(index)
            .chain(shifted)
            .map(|i| PriorTask {
                index: i,
                task: before[i].clone(),
            })
            .collect();
        self.record(MutationKind::Move(column), Vec::new(), prior);
        self.tasks.get(index)
    }

    /// Empty the store (project switch, logout).
    pub fn clear(&mut self) {
        let prior = self.snapshot(0..self.tasks.len());
        self.tasks.clear();
        self.record(MutationKind::Clear, Vec::new(), prior);
    }

    /// Reverse the most recent mutation using its undo descriptor.
    ///
    /// Returns false when there is nothing to revert. The descriptor is
    /// consumed, so a second call is a no-op.
    pub fn revert_last_mutation(&mut self) -> bool {
        let Some(mutation) = self.last_mutation.take() else {
            return false;
        };
        tracing::debug!("Reverting last store mutation: {:?}", mutation.kind);

        self.tasks.retain(|t| !mutation.created.contains(&t.id));

        let mut prior = mutation.prior;
        prior.sort_by_key(|p| p.index);
        for PriorTask { index, task } in prior {
            match self.index_of(&task.id) {
                Some(current) => self.tasks[current] = task,
                None => {
                    let at = index.min(self.tasks.len());
                    self.tasks.insert(at, task);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::column_order;

    fn titled(store: &TaskStore, column: ColumnKey) -> Vec<String> {
        column_order(store.tasks(), column)
            .iter()
            .map(|id| store.get(id).unwrap().title.clone())
            .collect()
    }

    fn add(store: &mut TaskStore, title: &str, priority: TaskPriority) -> Task {
        store.create_task(
            Task::new("p1", title).with_priority(priority),
            TaskPlacement::append(),
        )
    }

    #[test]
    fn create_assigns_append_positions() {
        let mut store = TaskStore::new();
        let a = add(&mut store, "A", TaskPriority::Low);
        let b = add(&mut store, "B", TaskPriority::Low);
        let c = add(&mut store, "C", TaskPriority::High);

        assert_eq!(a.position, 0);
        assert_eq!(b.position, 1);
        assert_eq!(c.position, 0);
        assert_eq!(c.status_position, 2);
    }

    #[test]
    fn create_respects_explicit_position() {
        let mut store = TaskStore::new();
        add(&mut store, "A", TaskPriority::Low);
        let placed = store.create_task(
            Task::new("p1", "B").with_priority(TaskPriority::Low),
            TaskPlacement {
                position: Some(40),
                status_position: None,
            },
        );
        assert_eq!(placed.position, 40);

        let next = add(&mut store, "C", TaskPriority::Low);
        assert_eq!(next.position, 41);
    }

    #[test]
    fn update_merges_and_bumps_version() {
        let mut store = TaskStore::new();
        let a = add(&mut store, "A", TaskPriority::Low);

        let updated = store.update_task(&a.id, TaskUpdate::title("A2")).unwrap();
        assert_eq!(updated.title, "A2");
        assert_eq!(updated.version, 2);
        assert!(updated.updated_at >= a.updated_at);
    }

    #[test]
    fn update_priority_change_appends_to_new_column() {
        let mut store = TaskStore::new();
        add(&mut store, "H1", TaskPriority::High);
        add(&mut store, "H2", TaskPriority::High);
        let low = add(&mut store, "L", TaskPriority::Low);

        let updates = TaskUpdate {
            priority: Some(TaskPriority::High),
            ..Default::default()
        };
        let moved = store.update_task(&low.id, updates).unwrap();
        assert_eq!(moved.position, 2);
    }

    #[test]
    fn update_unknown_id_is_noop() {
        let mut store = TaskStore::new();
        add(&mut store, "A", TaskPriority::Low);
        let before = store.tasks().to_vec();

        assert!(store.update_task("missing", TaskUpdate::title("x")).is_none());
        assert_eq!(store.tasks(), &before[..]);
        assert_eq!(store.last_mutation().unwrap().kind, MutationKind::Create);
    }

    #[test]
    fn delete_tasks_skips_missing() {
        let mut store = TaskStore::new();
        let a = add(&mut store, "A", TaskPriority::Low);
        let b = add(&mut store, "B", TaskPriority::Low);

        let removed = store.delete_tasks(&[a.id.clone(), "ghost".to_string()]);
        assert_eq!(removed.len(), 1);
        assert!(!store.contains(&a.id));
        assert!(store.contains(&b.id));
    }

    #[test]
    fn reorder_assigns_index_positions() {
        let mut store = TaskStore::new();
        let a = add(&mut store, "A", TaskPriority::High);
        let b = add(&mut store, "B", TaskPriority::High);
        let c = add(&mut store, "C", TaskPriority::High);

        store.reorder_tasks(TaskPriority::High, &[c.id.clone(), a.id.clone(), b.id.clone()]);
        assert_eq!(titled(&store, ColumnKey::Priority(TaskPriority::High)), ["C", "A", "B"]);
        assert_eq!(store.get(&c.id).unwrap().position, 0);
    }

    #[test]
    fn reorder_ignores_tasks_outside_column() {
        let mut store = TaskStore::new();
        let a = add(&mut store, "A", TaskPriority::High);
        let low = add(&mut store, "L", TaskPriority::Low);

        store.reorder_tasks(TaskPriority::High, &[low.id.clone(), a.id.clone()]);
        assert_eq!(store.get(&a.id).unwrap().position, 1);
        assert_eq!(store.get(&low.id).unwrap().position, 0);
        assert_eq!(store.get(&low.id).unwrap().version, 1);
    }

    #[test]
    fn reorder_by_status_uses_status_position() {
        let mut store = TaskStore::new();
        let a = add(&mut store, "A", TaskPriority::High);
        let b = add(&mut store, "B", TaskPriority::Low);

        store.reorder_tasks_by_status(TaskStatus::NotStarted, &[b.id.clone(), a.id.clone()]);
        assert_eq!(titled(&store, ColumnKey::Status(TaskStatus::NotStarted)), ["B", "A"]);
    }

    #[test]
    fn bulk_update_appends_movers_in_given_order() {
        let mut store = TaskStore::new();
        let keep = add(&mut store, "Keep", TaskPriority::High);
        let x = add(&mut store, "X", TaskPriority::Low);
        let y = add(&mut store, "Y", TaskPriority::Low);

        let count = store.bulk_update(
            &[y.id.clone(), keep.id.clone(), x.id.clone()],
            &BulkUpdate::priority(TaskPriority::High),
        );

        assert_eq!(count, 3);
        assert_eq!(store.get(&keep.id).unwrap().position, 0);
        assert_eq!(store.get(&y.id).unwrap().position, 1);
        assert_eq!(store.get(&x.id).unwrap().position, 2);
    }

    #[test]
    fn bulk_update_status() {
        let mut store = TaskStore::new();
        let a = add(&mut store, "A", TaskPriority::Low);
        let b = add(&mut store, "B", TaskPriority::Low);

        store.bulk_update(
            &[a.id.clone(), b.id.clone()],
            &BulkUpdate::status(TaskStatus::Completed),
        );
        assert!(store.tasks().iter().all(|t| t.status == TaskStatus::Completed));
    }

    #[test]
    fn update_priority_inserts_at_destination() {
        let mut store = TaskStore::new();
        add(&mut store, "A", TaskPriority::High);
        add(&mut store, "B", TaskPriority::High);
        let moving = add(&mut store, "M", TaskPriority::Low);

        store.update_priority(&moving.id, TaskPriority::High, Some(1));
        assert_eq!(titled(&store, ColumnKey::Priority(TaskPriority::High)), ["A", "M", "B"]);
        assert_eq!(store.get(&moving.id).unwrap().version, 2);
    }

    #[test]
    fn update_status_appends_without_destination() {
        let mut store = TaskStore::new();
        let a = add(&mut store, "A", TaskPriority::High);
        let b = add(&mut store, "B", TaskPriority::High);
        store.update_status(&a.id, TaskStatus::InProgress, None);
        store.update_status(&b.id, TaskStatus::InProgress, None);

        assert_eq!(titled(&store, ColumnKey::Status(TaskStatus::InProgress)), ["A", "B"]);
    }

    #[test]
    fn load_tasks_does_not_record_descriptor() {
        let mut store = TaskStore::new();
        add(&mut store, "A", TaskPriority::Low);
        assert!(store.last_mutation().is_some());

        store.load_tasks(vec![Task::new("p1", "Fetched")]);
        assert!(store.last_mutation().is_none());
        assert!(!store.revert_last_mutation());
    }

    #[test]
    fn revert_each_mutation_kind() {
        let mut store = TaskStore::new();
        let a = add(&mut store, "A", TaskPriority::High);
        let b = add(&mut store, "B", TaskPriority::High);
        let c = add(&mut store, "C", TaskPriority::Low);
        let baseline = store.tasks().to_vec();

        store.update_task(&a.id, TaskUpdate::title("changed"));
        assert!(store.revert_last_mutation());
        assert_eq!(store.tasks(), &baseline[..]);

        store.delete_tasks(&[a.id.clone(), c.id.clone()]);
        assert!(store.revert_last_mutation());
        assert_eq!(store.tasks(), &baseline[..]);

        store.reorder_tasks(TaskPriority::High, &[b.id.clone(), a.id.clone()]);
        assert!(store.revert_last_mutation());
        assert_eq!(store.tasks(), &baseline[..]);

        store.bulk_update(&[c.id.clone()], &BulkUpdate::priority(TaskPriority::High));
        assert!(store.revert_last_mutation());
        assert_eq!(store.tasks(), &baseline[..]);

        store.update_priority(&c.id, TaskPriority::High, Some(0));
        assert!(store.revert_last_mutation());
        assert_eq!(store.tasks(), &baseline[..]);

        add(&mut store, "D", TaskPriority::Low);
        assert!(store.revert_last_mutation());
        assert_eq!(store.tasks(), &baseline[..]);

        store.clear();
        assert!(store.is_empty());
        assert!(store.revert_last_mutation());
        assert_eq!(store.tasks(), &baseline[..]);
    }

    #[test]
    fn create_replacing_duplicate_reverts_to_replaced_copy() {
        let mut store = TaskStore::new();
        let a = add(&mut store, "A", TaskPriority::Low);
        add(&mut store, "B", TaskPriority::Low);
        let baseline = store.tasks().to_vec();

        let mut newer = a.clone();
        newer.title = "A again".to_string();
        store.create_task(newer, TaskPlacement::append());
        assert_eq!(store.len(), 2);
        assert_eq!(titled(&store, ColumnKey::Priority(TaskPriority::Low)), ["B", "A again"]);

        assert!(store.revert_last_mutation());
        assert_eq!(store.tasks(), &baseline[..]);
    }

    #[test]
    fn stamp_syncs_metadata_without_recording() {
        let mut store = TaskStore::new();
        let a = add(&mut store, "A", TaskPriority::Low);
        store.take_last_mutation();

        let mut server = a.clone();
        server.version = 7;
        server.updated_by = Some("alice".to_string());
        server.title = "ignored".to_string();
        store.stamp(&server);

        let local = store.get(&a.id).unwrap();
        assert_eq!(local.version, 7);
        assert_eq!(local.updated_by.as_deref(), Some("alice"));
        assert_eq!(local.title, "A");
        assert!(store.last_mutation().is_none());
    }
}
