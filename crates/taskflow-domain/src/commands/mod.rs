//! Reversible task commands.
//!
//! A command is built in two steps. UI code constructs a [`TaskCommand`]
//! from a plain parameter struct (validated on construction), and the
//! history turns it into a [`PreparedCommand`] by calling
//! [`TaskCommand::prepare`] with the current store. Preparing captures the
//! prior-state snapshot the command needs to reverse itself, so a command
//! that can be undone always owns its snapshot.

use crate::gateway::TaskGateway;
use crate::positions::ColumnKey;
use crate::{ProjectId, TaskId, TaskStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use taskflow_core::{TaskflowError, TaskflowResult};
use tokio::sync::RwLock;

pub mod bulk_update;
pub mod create_task;
pub mod delete_tasks;
pub mod move_task;
pub mod reorder_tasks;
pub mod update_task;

pub use bulk_update::{BulkUpdateCommand, BulkUpdateParams};
pub use create_task::{CreateTaskCommand, CreateTaskParams};
pub use delete_tasks::{DeleteTasksCommand, DeleteTasksParams};
pub use move_task::{MoveTaskCommand, MoveTaskParams};
pub use reorder_tasks::{ReorderTasksCommand, ReorderTasksParams};
pub use update_task::{UpdateTaskCommand, UpdateTaskParams};

pub type SharedStore = Arc<RwLock<TaskStore>>;

/// What a command runs against: the project's store and its gateway.
#[derive(Clone)]
pub struct CommandContext {
    pub project_id: ProjectId,
    pub store: SharedStore,
    pub gateway: Arc<dyn TaskGateway>,
}

impl CommandContext {
    pub fn new(project_id: impl Into<ProjectId>, gateway: Arc<dyn TaskGateway>) -> Self {
        Self {
            project_id: project_id.into(),
            store: Arc::new(RwLock::new(TaskStore::new())),
            gateway,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Create,
    Update,
    Delete,
    BulkUpdate,
    Reorder,
    Move,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::BulkUpdate => "bulk_update",
            Self::Reorder => "reorder",
            Self::Move => "move",
        };
        f.write_str(name)
    }
}

/// A reversible user action.
///
/// Both operations suspend only at gateway calls and mutate the store only
/// after the gateway confirms. A failure is returned unchanged and leaves the
/// store as it was.
#[async_trait]
pub trait Command: Send + Sync {
    /// Perform the action. Also used for redo.
    async fn execute(&mut self, ctx: &CommandContext) -> TaskflowResult<()>;

    /// Reverse the action using the captured snapshot.
    async fn undo(&mut self, ctx: &CommandContext) -> TaskflowResult<()>;

    /// Human-readable description of what this command does
    fn description(&self) -> String;

    fn kind(&self) -> CommandKind;

    /// Tasks whose server state an undo or redo of this command would overwrite.
    fn touched_tasks(&self) -> Vec<TaskId>;
}

/// A validated, not yet prepared command.
#[derive(Debug, Clone)]
pub enum TaskCommand {
    Create(CreateTaskParams),
    Update(UpdateTaskParams),
    Delete(DeleteTasksParams),
    BulkUpdate(BulkUpdateParams),
    Reorder(ReorderTasksParams),
    Move(MoveTaskParams),
}

impl TaskCommand {
    pub fn create(params: CreateTaskParams) -> TaskflowResult<Self> {
        params.validate()?;
        Ok(Self::Create(params))
    }

    pub fn update(params: UpdateTaskParams) -> TaskflowResult<Self> {
        params.validate()?;
        Ok(Self::Update(params))
    }

    pub fn delete(params: DeleteTasksParams) -> TaskflowResult<Self> {
        params.validate()?;
        Ok(Self::Delete(params))
    }

    pub fn bulk_update(params: BulkUpdateParams) -> TaskflowResult<Self> {
        params.validate()?;
        Ok(Self::BulkUpdate(params))
    }

    pub fn reorder(params: ReorderTasksParams) -> TaskflowResult<Self> {
        params.validate()?;
        Ok(Self::Reorder(params))
    }

    pub fn move_task(params: MoveTaskParams) -> TaskflowResult<Self> {
        params.validate()?;
        Ok(Self::Move(params))
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Create(_) => CommandKind::Create,
            Self::Update(_) => CommandKind::Update,
            Self::Delete(_) => CommandKind::Delete,
            Self::BulkUpdate(_) => CommandKind::BulkUpdate,
            Self::Reorder(_) => CommandKind::Reorder,
            Self::Move(_) => CommandKind::Move,
        }
    }

    /// Capture the undo snapshot from the current store state.
    pub fn prepare(self, store: &TaskStore) -> TaskflowResult<PreparedCommand> {
        Ok(match self {
            Self::Create(params) => PreparedCommand::Create(CreateTaskCommand::prepare(params)),
            Self::Update(params) => {
                PreparedCommand::Update(UpdateTaskCommand::prepare(params, store)?)
            }
            Self::Delete(params) => {
                PreparedCommand::Delete(DeleteTasksCommand::prepare(params, store)?)
            }
            Self::BulkUpdate(params) => {
                PreparedCommand::BulkUpdate(BulkUpdateCommand::prepare(params, store)?)
            }
            Self::Reorder(params) => {
                PreparedCommand::Reorder(ReorderTasksCommand::prepare(params, store)?)
            }
            Self::Move(params) => PreparedCommand::Move(MoveTaskCommand::prepare(params, store)?),
        })
    }
}

/// A command that owns its undo snapshot and may enter the history.
pub enum PreparedCommand {
    Create(CreateTaskCommand),
    Update(UpdateTaskCommand),
    Delete(DeleteTasksCommand),
    BulkUpdate(BulkUpdateCommand),
    Reorder(ReorderTasksCommand),
    Move(MoveTaskCommand),
}

impl PreparedCommand {
    fn inner(&self) -> &dyn Command {
        match self {
            Self::Create(cmd) => cmd,
            Self::Update(cmd) => cmd,
            Self::Delete(cmd) => cmd,
            Self::BulkUpdate(cmd) => cmd,
            Self::Reorder(cmd) => cmd,
            Self::Move(cmd) => cmd,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Command {
        match self {
            Self::Create(cmd) => cmd,
            Self::Update(cmd) => cmd,
            Self::Delete(cmd) => cmd,
            Self::BulkUpdate(cmd) => cmd,
            Self::Reorder(cmd) => cmd,
            Self::Move(cmd) => cmd,
        }
    }
}

#[async_trait]
impl Command for PreparedCommand {
    async fn execute(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        self.inner_mut().execute(ctx).await
    }

    async fn undo(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        self.inner_mut().undo(ctx).await
    }

    fn description(&self) -> String {
        self.inner().description()
    }

    fn kind(&self) -> CommandKind {
        self.inner().kind()
    }

    fn touched_tasks(&self) -> Vec<TaskId> {
        self.inner().touched_tasks()
    }
}

impl fmt::Debug for PreparedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedCommand")
            .field("kind", &self.kind())
            .field("description", &self.description())
            .finish()
    }
}

/// Look a task up for snapshotting, failing when the store does not have it.
pub(crate) fn require_task<'a>(store: &'a TaskStore, task_id: &str) -> TaskflowResult<&'a crate::Task> {
    store
        .get(task_id)
        .ok_or_else(|| TaskflowError::NotFound(format!("Task {} not in store", task_id)))
}

pub(crate) fn require_ids(ids: &[TaskId], what: &str) -> TaskflowResult<()> {
    if ids.is_empty() {
        return Err(TaskflowError::Validation(format!("{} needs at least one task", what)));
    }
    let unique: HashSet<&TaskId> = ids.iter().collect();
    if unique.len() != ids.len() {
        return Err(TaskflowError::Validation(format!("{} lists a task twice", what)));
    }
    if ids.iter().any(|id| id.trim().is_empty()) {
        return Err(TaskflowError::Validation(format!("{} has an empty task id", what)));
    }
    Ok(())
}

/// Send a column reorder to the gateway on the column's axis.
pub(crate) async fn reorder_remote(
    ctx: &CommandContext,
    column: ColumnKey,
    ordered_ids: &[TaskId],
) -> TaskflowResult<()> {
    match column {
        ColumnKey::Priority(priority) => {
            ctx.gateway
                .reorder_tasks(&ctx.project_id, priority, ordered_ids)
                .await
        }
        ColumnKey::Status(status) => {
            ctx.gateway
                .reorder_tasks_by_status(&ctx.project_id, status, ordered_ids)
                .await
        }
    }
}

/// The first failure of a fan-out, once its successes have been mirrored.
pub(crate) fn first_error<T>(results: Vec<TaskflowResult<T>>) -> TaskflowResult<()> {
    results.into_iter().try_for_each(|result| result.map(|_| ()))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TaskPriority, TaskUpdate};

    #[test]
    fn test_factories_validate_before_construction() {
        assert!(TaskCommand::create(CreateTaskParams::new("   ")).is_err());
        assert!(TaskCommand::update(UpdateTaskParams::new("t1", TaskUpdate::default())).is_err());
        assert!(TaskCommand::delete(DeleteTasksParams::new(vec![])).is_err());
        assert!(TaskCommand::reorder(ReorderTasksParams::new(
            ColumnKey::Priority(TaskPriority::High),
            vec!["a".to_string(), "a".to_string()],
        ))
        .is_err());
    }

    #[test]
    fn test_prepare_requires_task_in_store() {
        let store = TaskStore::new();
        let command = TaskCommand::update(UpdateTaskParams::new("ghost", TaskUpdate::title("x"))).unwrap();
        let result = command.prepare(&store);
        assert!(matches!(result, Err(TaskflowError::NotFound(_))));
    }

    #[test]
    fn test_kind_survives_prepare() {
        let store = TaskStore::new();
        let command = TaskCommand::create(CreateTaskParams::new("Write spec")).unwrap();
        assert_eq!(command.kind(), CommandKind::Create);
        let prepared = command.prepare(&store).unwrap();
        assert_eq!(prepared.kind(), CommandKind::Create);
        assert_eq!(prepared.description(), "Create task 'Write spec'");
    }
}
