use super::{require_task, Command, CommandContext, CommandKind};
use crate::{TaskId, TaskStore, TaskUpdate};
use async_trait::async_trait;
use taskflow_core::{Editable, TaskflowError, TaskflowResult};

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTaskParams {
    pub task_id: TaskId,
    pub updates: TaskUpdate,
}

impl UpdateTaskParams {
    pub fn new(task_id: impl Into<TaskId>, updates: TaskUpdate) -> Self {
        Self {
            task_id: task_id.into(),
            updates,
        }
    }

    pub(crate) fn validate(&self) -> TaskflowResult<()> {
        if self.task_id.trim().is_empty() {
            return Err(TaskflowError::Validation("Task id cannot be empty".into()));
        }
        if self.updates.is_empty() {
            return Err(TaskflowError::Validation("Update changes no fields".into()));
        }
        if self.updates.version.is_some() || self.updates.updated_by.is_some() {
            return Err(TaskflowError::Validation(
                "Version and author are assigned by the server".into(),
            ));
        }
        if self
            .updates
            .title
            .as_ref()
            .is_some_and(|title| title.trim().is_empty())
        {
            return Err(TaskflowError::Validation("Task title cannot be empty".into()));
        }
        Ok(())
    }
}

/// Partial update of one task. The snapshot holds the prior values of
/// exactly the fields being changed.
pub struct UpdateTaskCommand {
    task_id: TaskId,
    title: String,
    updates: TaskUpdate,
    prior: TaskUpdate,
}

impl UpdateTaskCommand {
    pub(crate) fn prepare(params: UpdateTaskParams, store: &TaskStore) -> TaskflowResult<Self> {
        let task = require_task(store, &params.task_id)?;
        Ok(Self {
            prior: params.updates.prior_values(task),
            title: task.title.clone(),
            task_id: params.task_id,
            updates: params.updates,
        })
    }

    pub fn prior(&self) -> &TaskUpdate {
        &self.prior
    }

    async fn apply(&self, ctx: &CommandContext, updates: TaskUpdate) -> TaskflowResult<()> {
        let task = ctx
            .gateway
            .update_task(&ctx.project_id, &self.task_id, updates)
            .await?;

        ctx.store
            .write()
            .await
            .update_task(&self.task_id, TaskUpdate::from_entity(&task));
        Ok(())
    }
}

#[async_trait]
impl Command for UpdateTaskCommand {
    async fn execute(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        self.apply(ctx, self.updates.clone()).await
    }

    async fn undo(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        self.apply(ctx, self.prior.clone()).await
    }

    fn description(&self) -> String {
        format!("Update task '{}'", self.title)
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Update
    }

    fn touched_tasks(&self) -> Vec<TaskId> {
        vec![self.task_id.clone()]
    }
}
