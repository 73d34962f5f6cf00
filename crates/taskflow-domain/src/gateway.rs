use crate::{BulkUpdate, NewTask, Task, TaskId, TaskPriority, TaskStatus, TaskUpdate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use taskflow_core::TaskflowResult;

/// Remote boundary for task persistence.
///
/// Implementations send a mutation to the server and return its canonical
/// view of the result: assigned ids, bumped versions, and positions the
/// server may have recalculated. A version mismatch is reported as
/// `TaskflowError::VersionConflict`, not resolved here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskGateway: Send + Sync {
    async fn fetch_tasks(&self, project_id: &str) -> TaskflowResult<Vec<Task>>;

    async fn fetch_task(&self, project_id: &str, task_id: &str) -> TaskflowResult<Option<Task>>;

    async fn create_task(&self, project_id: &str, task: NewTask) -> TaskflowResult<Task>;

    async fn update_task(
        &self,
        project_id: &str,
        task_id: &str,
        updates: TaskUpdate,
    ) -> TaskflowResult<Task>;

    async fn delete_task(&self, project_id: &str, task_id: &str) -> TaskflowResult<()>;

    async fn delete_tasks(&self, project_id: &str, task_ids: &[TaskId]) -> TaskflowResult<()>;

    async fn update_task_priority(
        &self,
        project_id: &str,
        task_id: &str,
        priority: TaskPriority,
        destination_index: Option<usize>,
    ) -> TaskflowResult<Task>;

    async fn update_task_status(
        &self,
        project_id: &str,
        task_id: &str,
        status: TaskStatus,
        destination_index: Option<usize>,
    ) -> TaskflowResult<Task>;

    async fn reorder_tasks(
        &self,
        project_id: &str,
        priority: TaskPriority,
        ordered_ids: &[TaskId],
    ) -> TaskflowResult<()>;

    async fn reorder_tasks_by_status(
        &self,
        project_id: &str,
        status: TaskStatus,
        ordered_ids: &[TaskId],
    ) -> TaskflowResult<()>;

    async fn bulk_update_tasks(
        &self,
        project_id: &str,
        task_ids: &[TaskId],
        updates: BulkUpdate,
    ) -> TaskflowResult<()>;
}

/// Names of gateway operations, for call recording and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOp {
    FetchTasks,
    FetchTask,
    CreateTask,
    UpdateTask,
    DeleteTask,
    DeleteTasks,
    UpdateTaskPriority,
    UpdateTaskStatus,
    ReorderTasks,
    ReorderTasksByStatus,
    BulkUpdateTasks,
}

impl GatewayOp {
    /// Reads do not mutate server state.
    pub fn is_read(self) -> bool {
        matches!(self, Self::FetchTasks | Self::FetchTask)
    }
}

impl fmt::Display for GatewayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchTasks => "fetch_tasks",
            Self::FetchTask => "fetch_task",
            Self::CreateTask => "create_task",
            Self::UpdateTask => "update_task",
            Self::DeleteTask => "delete_task",
            Self::DeleteTasks => "delete_tasks",
            Self::UpdateTaskPriority => "update_task_priority",
            Self::UpdateTaskStatus => "update_task_status",
            Self::ReorderTasks => "reorder_tasks",
            Self::ReorderTasksByStatus => "reorder_tasks_by_status",
            Self::BulkUpdateTasks => "bulk_update_tasks",
        };
        f.write_str(name)
    }
}
