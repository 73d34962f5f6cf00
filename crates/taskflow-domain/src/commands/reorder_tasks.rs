use super::{reorder_remote, require_ids, require_task, Command, CommandContext, CommandKind};
use crate::positions::{column_order, ColumnKey};
use crate::{TaskId, TaskStore};
use async_trait::async_trait;
use taskflow_core::{TaskflowError, TaskflowResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ReorderTasksParams {
    pub column: ColumnKey,
    pub ordered_ids: Vec<TaskId>,
}

impl ReorderTasksParams {
    pub fn new(column: ColumnKey, ordered_ids: Vec<TaskId>) -> Self {
        Self {
            column,
            ordered_ids,
        }
    }

    pub(crate) fn validate(&self) -> TaskflowResult<()> {
        require_ids(&self.ordered_ids, "Reorder")
    }
}

/// Reorder the tasks of one column. The snapshot is the column's full
/// order before the change.
pub struct ReorderTasksCommand {
    column: ColumnKey,
    ordered_ids: Vec<TaskId>,
    prior_order: Vec<TaskId>,
}

impl ReorderTasksCommand {
    pub(crate) fn prepare(params: ReorderTasksParams, store: &TaskStore) -> TaskflowResult<Self> {
        for id in &params.ordered_ids {
            let task = require_task(store, id)?;
            if !params.column.contains(task) {
                return Err(TaskflowError::Validation(format!(
                    "Task '{}' is not in column {}",
                    task.title, params.column
                )));
            }
        }

        Ok(Self {
            prior_order: column_order(store.tasks(), params.column),
            column: params.column,
            ordered_ids: params.ordered_ids,
        })
    }

    pub fn prior_order(&self) -> &[TaskId] {
        &self.prior_order
    }

    async fn apply(&self, ctx: &CommandContext, order: &[TaskId]) -> TaskflowResult<()> {
        reorder_remote(ctx, self.column, order).await?;
        ctx.store.write().await.reorder_column(self.column, order);
        Ok(())
    }
}

#[async_trait]
impl Command for ReorderTasksCommand {
    async fn execute(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        self.apply(ctx, &self.ordered_ids).await
    }

    async fn undo(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        self.apply(ctx, &self.prior_order).await
    }

    fn description(&self) -> String {
        format!("Reorder {} tasks in {}", self.ordered_ids.len(), self.column)
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Reorder
    }

    fn touched_tasks(&self) -> Vec<TaskId> {
        let mut ids = self.prior_order.clone();
        for id in &self.ordered_ids {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}
