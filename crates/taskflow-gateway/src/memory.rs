use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use taskflow_core::{TaskflowConfig, TaskflowError, TaskflowResult, VersionConflict};
use taskflow_domain::positions::ColumnKey;
use taskflow_domain::{
    BulkUpdate, GatewayOp, NewTask, Task, TaskGateway, TaskId, TaskPlacement, TaskPriority,
    TaskStatus, TaskStore, TaskUpdate,
};
use tokio::sync::Mutex;

/// How an injected failure surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureMode {
    /// A transport or server error with this message.
    Error(String),
    /// A version conflict on the first task the call names.
    Conflict,
}

#[derive(Debug, Clone)]
struct Failure {
    mode: FailureMode,
    /// `None` fails every call until cleared.
    remaining: Option<usize>,
}

/// One recorded gateway invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayCall {
    pub op: String,
    pub project_id: String,
    pub task_ids: Vec<TaskId>,
}

#[derive(Default)]
struct ServerState {
    projects: HashMap<String, TaskStore>,
    calls: Vec<(GatewayOp, GatewayCall)>,
    failures: HashMap<GatewayOp, Failure>,
}

impl ServerState {
    fn project(&mut self, project_id: &str) -> &mut TaskStore {
        self.projects.entry(project_id.to_string()).or_default()
    }

    /// Record the call and return the injected failure for it, if any.
    fn begin(&mut self, op: GatewayOp, project_id: &str, task_ids: Vec<TaskId>) -> TaskflowResult<()> {
        self.calls.push((
            op,
            GatewayCall {
                op: op.to_string(),
                project_id: project_id.to_string(),
                task_ids: task_ids.clone(),
            },
        ));

        let Some(failure) = self.failures.get_mut(&op) else {
            return Ok(());
        };
        let mode = failure.mode.clone();
        let exhausted = match failure.remaining.as_mut() {
            Some(n) => {
                *n = n.saturating_sub(1);
                *n == 0
            }
            None => false,
        };
        if exhausted {
            self.failures.remove(&op);
        }

        tracing::debug!("Injected failure on {}: {:?}", op, mode);
        match mode {
            FailureMode::Error(message) => Err(TaskflowError::Gateway(message)),
            FailureMode::Conflict => {
                let task_id = task_ids.first().cloned().unwrap_or_default();
                let current = self
                    .project(project_id)
                    .get(&task_id)
                    .map_or(0, |t| t.version);
                Err(TaskflowError::VersionConflict(VersionConflict {
                    task_id,
                    expected_version: current,
                    current_version: current + 1,
                }))
            }
        }
    }
}

/// A task server held in memory.
///
/// Each project gets its own [`TaskStore`], so ids, versions, and positions
/// follow the same rules the client applies locally. Every call is recorded,
/// including calls that fail.
pub struct InMemoryGateway {
    state: Mutex<ServerState>,
    actor: Option<String>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServerState::default()),
            actor: None,
        }
    }

    pub fn from_config(config: &TaskflowConfig) -> Self {
        let mut gateway = Self::new();
        gateway.actor = config.actor.clone();
        gateway
    }

    /// Identity stamped into `updated_by` on every write.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Add tasks to a project as if they had been created earlier.
    ///
    /// Tasks get append positions in the order given. Not recorded as calls.
    pub async fn seed(&self, project_id: &str, requests: Vec<NewTask>) -> Vec<Task> {
        let mut state = self.state.lock().await;
        let store = state.project(project_id);
        let seeded = requests
            .into_iter()
            .map(|request| {
                let placement = placement_of(&request);
                store.create_task(Task::from_new(project_id, request), placement)
            })
            .collect();
        store.take_last_mutation();
        seeded
    }

    /// Fail the next `times` calls to `op`.
    pub async fn fail_next(&self, op: GatewayOp, mode: FailureMode, times: usize) {
        if times == 0 {
            return;
        }
        self.state.lock().await.failures.insert(
            op,
            Failure {
                mode,
                remaining: Some(times),
            },
        );
    }

    /// Fail every call to `op` until [`clear_failures`](Self::clear_failures).
    pub async fn fail_always(&self, op: GatewayOp, mode: FailureMode) {
        self.state.lock().await.failures.insert(
            op,
            Failure {
                mode,
                remaining: None,
            },
        );
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    /// Apply an edit as another user would, bumping the server version.
    pub async fn simulate_external_edit(
        &self,
        project_id: &str,
        task_id: &str,
        mut updates: TaskUpdate,
        editor: &str,
    ) -> TaskflowResult<Task> {
        let mut state = self.state.lock().await;
        updates.version = None;
        updates.updated_by = Some(editor.to_string());
        let task = state
            .project(project_id)
            .update_task(task_id, updates)
            .cloned()
            .ok_or_else(|| not_found(task_id))?;
        tracing::debug!("External edit on {} by {}, now v{}", task_id, editor, task.version);
        Ok(task)
    }

    /// Server-side copy of a project's tasks.
    pub async fn tasks(&self, project_id: &str) -> Vec<Task> {
        let state = self.state.lock().await;
        state
            .projects
            .get(project_id)
            .map(|store| store.tasks().to_vec())
            .unwrap_or_default()
    }

    pub async fn calls(&self) -> Vec<GatewayCall> {
        let state = self.state.lock().await;
        state.calls.iter().map(|(_, call)| call.clone()).collect()
    }

    pub async fn call_count(&self, op: GatewayOp) -> usize {
        let state = self.state.lock().await;
        state.calls.iter().filter(|(o, _)| *o == op).count()
    }

    /// Calls that could have changed server state (reads excluded).
    pub async fn mutation_count(&self) -> usize {
        let state = self.state.lock().await;
        state.calls.iter().filter(|(op, _)| !op.is_read()).count()
    }

    pub async fn reset_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Sign a task the server just wrote.
    fn sign(&self, store: &mut TaskStore, task_id: &str) -> Option<Task> {
        let mut task = store.get(task_id)?.clone();
        if self.actor.is_some() {
            task.updated_by = self.actor.clone();
            store.stamp(&task);
        }
        Some(task)
    }

    async fn move_task(
        &self,
        op: GatewayOp,
        project_id: &str,
        task_id: &str,
        column: ColumnKey,
        destination_index: Option<usize>,
    ) -> TaskflowResult<Task> {
        let mut state = self.state.lock().await;
        state.begin(op, project_id, vec![task_id.to_string()])?;
        let store = state.project(project_id);
        if !store.contains(task_id) {
            return Err(not_found(task_id));
        }
        match column {
            ColumnKey::Priority(priority) => store.update_priority(task_id, priority, destination_index),
            ColumnKey::Status(status) => store.update_status(task_id, status, destination_index),
        };
        self.sign(store, task_id).ok_or_else(|| not_found(task_id))
    }

    async fn reorder(
        &self,
        op: GatewayOp,
        project_id: &str,
        column: ColumnKey,
        ordered_ids: &[TaskId],
    ) -> TaskflowResult<()> {
        let mut state = self.state.lock().await;
        state.begin(op, project_id, ordered_ids.to_vec())?;
        let store = state.project(project_id);
        if let Some(missing) = ordered_ids.iter().find(|id| !store.contains(id)) {
            return Err(not_found(missing));
        }
        store.reorder_column(column, ordered_ids);
        for id in ordered_ids {
            self.sign(store, id);
        }
        Ok(())
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(task_id: &str) -> TaskflowError {
    TaskflowError::Gateway(format!("Task {} not found", task_id))
}

fn placement_of(request: &NewTask) -> TaskPlacement {
    TaskPlacement {
        position: request.position,
        status_position: request.status_position,
    }
}

#[async_trait]
impl TaskGateway for InMemoryGateway {
    async fn fetch_tasks(&self, project_id: &str) -> TaskflowResult<Vec<Task>> {
        let mut state = self.state.lock().await;
        state.begin(GatewayOp::FetchTasks, project_id, Vec::new())?;
        Ok(state.project(project_id).tasks().to_vec())
    }

    async fn fetch_task(&self, project_id: &str, task_id: &str) -> TaskflowResult<Option<Task>> {
        let mut state = self.state.lock().await;
        state.begin(GatewayOp::FetchTask, project_id, vec![task_id.to_string()])?;
        Ok(state.project(project_id).get(task_id).cloned())
    }

    async fn create_task(&self, project_id: &str, task: NewTask) -> TaskflowResult<Task> {
        let mut state = self.state.lock().await;
        state.begin(GatewayOp::CreateTask, project_id, task.id.iter().cloned().collect())?;
        if task.title.trim().is_empty() {
            return Err(TaskflowError::Gateway("Task title cannot be empty".into()));
        }

        let store = state.project(project_id);
        if let Some(id) = &task.id {
            if store.contains(id) {
                return Err(TaskflowError::Gateway(format!("Task {} already exists", id)));
            }
        }

        let placement = placement_of(&task);
        let mut created = Task::from_new(project_id, task);
        created.updated_by = self.actor.clone();
        let created = store.create_task(created, placement);
        tracing::debug!("Server created {} in {}", created.id, project_id);
        Ok(created)
    }

    async fn update_task(
        &self,
        project_id: &str,
        task_id: &str,
        mut updates: TaskUpdate,
    ) -> TaskflowResult<Task> {
        let mut state = self.state.lock().await;
        state.begin(GatewayOp::UpdateTask, project_id, vec![task_id.to_string()])?;
        updates.version = None;
        updates.updated_by = self.actor.clone();
        state
            .project(project_id)
            .update_task(task_id, updates)
            .cloned()
            .ok_or_else(|| not_found(task_id))
    }

    async fn delete_task(&self, project_id: &str, task_id: &str) -> TaskflowResult<()> {
        let mut state = self.state.lock().await;
        state.begin(GatewayOp::DeleteTask, project_id, vec![task_id.to_string()])?;
        state
            .project(project_id)
            .delete_task(task_id)
            .map(|_| ())
            .ok_or_else(|| not_found(task_id))
    }

    async fn delete_tasks(&self, project_id: &str, task_ids: &[TaskId]) -> TaskflowResult<()> {
        let mut state = self.state.lock().await;
        state.begin(GatewayOp::DeleteTasks, project_id, task_ids.to_vec())?;
        let store = state.project(project_id);
        let removed = store.delete_tasks(task_ids);
        if removed.len() != task_ids.len() {
            if !removed.is_empty() {
                store.revert_last_mutation();
            }
            return Err(TaskflowError::Gateway(format!(
                "Only {} of {} tasks exist; nothing deleted",
                removed.len(),
                task_ids.len()
            )));
        }
        Ok(())
    }

    async fn update_task_priority(
        &self,
        project_id: &str,
        task_id: &str,
        priority: TaskPriority,
        destination_index: Option<usize>,
    ) -> TaskflowResult<Task> {
        self.move_task(
            GatewayOp::UpdateTaskPriority,
            project_id,
            task_id,
            ColumnKey::Priority(priority),
            destination_index,
        )
        .await
    }

    async fn update_task_status(
        &self,
        project_id: &str,
        task_id: &str,
        status: TaskStatus,
        destination_index: Option<usize>,
    ) -> TaskflowResult<Task> {
        self.move_task(
            GatewayOp::UpdateTaskStatus,
            project_id,
            task_id,
            ColumnKey::Status(status),
            destination_index,
        )
        .await
    }

    async fn reorder_tasks(
        &self,
        project_id: &str,
        priority: TaskPriority,
        ordered_ids: &[TaskId],
    ) -> TaskflowResult<()> {
        self.reorder(
            GatewayOp::ReorderTasks,
            project_id,
            ColumnKey::Priority(priority),
            ordered_ids,
        )
        .await
    }

    async fn reorder_tasks_by_status(
        &self,
        project_id: &str,
        status: TaskStatus,
        ordered_ids: &[TaskId],
    ) -> TaskflowResult<()> {
        self.reorder(
            GatewayOp::ReorderTasksByStatus,
            project_id,
            ColumnKey::Status(status),
            ordered_ids,
        )
        .await
    }

    async fn bulk_update_tasks(
        &self,
        project_id: &str,
        task_ids: &[TaskId],
        updates: BulkUpdate,
    ) -> TaskflowResult<()> {
        let mut state = self.state.lock().await;
        state.begin(GatewayOp::BulkUpdateTasks, project_id, task_ids.to_vec())?;
        let store = state.project(project_id);
        if let Some(missing) = task_ids.iter().find(|id| !store.contains(id)) {
            return Err(not_found(missing));
        }
        store.bulk_update(task_ids, &updates);
        for id in task_ids {
            self.sign(store, id);
        }
        Ok(())
    }
}
