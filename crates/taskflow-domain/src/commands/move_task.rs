use super::{require_task, Command, CommandContext, CommandKind};
use crate::positions::{rank_in_column, ColumnKey};
use crate::{Task, TaskId, TaskStore};
use async_trait::async_trait;
use taskflow_core::{TaskflowError, TaskflowResult};

#[derive(Debug, Clone, PartialEq)]
pub struct MoveTaskParams {
    pub task_id: TaskId,
    pub target: ColumnKey,
    /// Rank within the target column; appended when `None`.
    pub destination_index: Option<usize>,
}

impl MoveTaskParams {
    pub fn new(task_id: impl Into<TaskId>, target: ColumnKey) -> Self {
        Self {
            task_id: task_id.into(),
            target,
            destination_index: None,
        }
    }

    pub fn at(mut self, destination_index: usize) -> Self {
        self.destination_index = Some(destination_index);
        self
    }

    pub(crate) fn validate(&self) -> TaskflowResult<()> {
        if self.task_id.trim().is_empty() {
            return Err(TaskflowError::Validation("Task id cannot be empty".into()));
        }
        Ok(())
    }
}

/// Move one task to another priority or status column, optionally at a
/// given rank. The snapshot is the column the task came from and its rank
/// there, so undo puts it back between the same neighbours.
pub struct MoveTaskCommand {
    task_id: TaskId,
    title: String,
    target: ColumnKey,
    destination_index: Option<usize>,
    origin: ColumnKey,
    origin_rank: Option<usize>,
}

impl MoveTaskCommand {
    pub(crate) fn prepare(params: MoveTaskParams, store: &TaskStore) -> TaskflowResult<Self> {
        let task = require_task(store, &params.task_id)?;
        let origin = params.target.same_axis_for(task);
        Ok(Self {
            origin_rank: rank_in_column(store.tasks(), origin, &task.id),
            origin,
            title: task.title.clone(),
            task_id: params.task_id,
            target: params.target,
            destination_index: params.destination_index,
        })
    }

    pub fn origin(&self) -> (ColumnKey, Option<usize>) {
        (self.origin, self.origin_rank)
    }

    async fn move_to(
        &self,
        ctx: &CommandContext,
        column: ColumnKey,
        destination_index: Option<usize>,
    ) -> TaskflowResult<()> {
        let server: Task = match column {
            ColumnKey::Priority(priority) => {
                ctx.gateway
                    .update_task_priority(&ctx.project_id, &self.task_id, priority, destination_index)
                    .await?
            }
            ColumnKey::Status(status) => {
                ctx.gateway
                    .update_task_status(&ctx.project_id, &self.task_id, status, destination_index)
                    .await?
            }
        };

        let mut store = ctx.store.write().await;
        match column {
            ColumnKey::Priority(priority) => {
                store.update_priority(&self.task_id, priority, destination_index);
            }
            ColumnKey::Status(status) => {
                store.update_status(&self.task_id, status, destination_index);
            }
        }
        store.stamp(&server);
        Ok(())
    }
}

#[async_trait]
impl Command for MoveTaskCommand {
    async fn execute(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        self.move_to(ctx, self.target, self.destination_index).await
    }

    async fn undo(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        self.move_to(ctx, self.origin, self.origin_rank).await
    }

    fn description(&self) -> String {
        format!("Move task '{}' to {}", self.title, self.target)
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Move
    }

    fn touched_tasks(&self) -> Vec<TaskId> {
        vec![self.task_id.clone()]
    }
}
