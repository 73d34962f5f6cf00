use super::{first_error, reorder_remote, require_ids, require_task, Command, CommandContext, CommandKind};
use crate::positions::{column_order, ColumnKey};
use crate::{BulkUpdate, TaskId, TaskStore};
use async_trait::async_trait;
use futures::future::join_all;
use taskflow_core::{TaskflowError, TaskflowResult};

#[derive(Debug, Clone, PartialEq)]
pub struct BulkUpdateParams {
    pub task_ids: Vec<TaskId>,
    pub updates: BulkUpdate,
}

impl BulkUpdateParams {
    pub fn new(task_ids: Vec<TaskId>, updates: BulkUpdate) -> Self {
        Self { task_ids, updates }
    }

    pub(crate) fn validate(&self) -> TaskflowResult<()> {
        require_ids(&self.task_ids, "Bulk update")?;
        if self.updates.is_empty() {
            return Err(TaskflowError::Validation(
                "Bulk update must set a status or a priority".into(),
            ));
        }
        Ok(())
    }
}

/// Tasks that shared the same prior values, restored together by one call.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorGroup {
    pub values: BulkUpdate,
    pub task_ids: Vec<TaskId>,
}

/// Apply one status and/or priority to many tasks.
///
/// The snapshot keeps each task's own prior value, grouped so that undo
/// issues one bulk call per distinct prior value, plus the order of every
/// column the tasks left so their relative order comes back too.
pub struct BulkUpdateCommand {
    task_ids: Vec<TaskId>,
    updates: BulkUpdate,
    prior: Vec<PriorGroup>,
    vacated_columns: Vec<(ColumnKey, Vec<TaskId>)>,
}

impl BulkUpdateCommand {
    pub(crate) fn prepare(params: BulkUpdateParams, store: &TaskStore) -> TaskflowResult<Self> {
        let mut prior: Vec<PriorGroup> = Vec::new();
        let mut vacated: Vec<ColumnKey> = Vec::new();

        for id in &params.task_ids {
            let task = require_task(store, id)?;
            let values = params.updates.prior_of(task);
            match prior.iter_mut().find(|group| group.values == values) {
                Some(group) => group.task_ids.push(id.clone()),
                None => prior.push(PriorGroup {
                    values,
                    task_ids: vec![id.clone()],
                }),
            }

            let leaving = [
                params
                    .updates
                    .priority
                    .filter(|p| *p != task.priority)
                    .map(|_| ColumnKey::of_priority(task)),
                params
                    .updates
                    .status
                    .filter(|s| *s != task.status)
                    .map(|_| ColumnKey::of_status(task)),
            ];
            for column in leaving.into_iter().flatten() {
                if !vacated.contains(&column) {
                    vacated.push(column);
                }
            }
        }

        let vacated_columns = vacated
            .into_iter()
            .map(|column| (column, column_order(store.tasks(), column)))
            .collect();

        Ok(Self {
            task_ids: params.task_ids,
            updates: params.updates,
            prior,
            vacated_columns,
        })
    }

    pub fn prior_groups(&self) -> &[PriorGroup] {
        &self.prior
    }

    /// Groups whose values actually differ from what the bulk update set.
    fn groups_to_restore(&self) -> impl Iterator<Item = &PriorGroup> {
        self.prior.iter().filter(move |group| group.values != self.updates)
    }
}

#[async_trait]
impl Command for BulkUpdateCommand {
    async fn execute(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        ctx.gateway
            .bulk_update_tasks(&ctx.project_id, &self.task_ids, self.updates)
            .await?;

        ctx.store
            .write()
            .await
            .bulk_update(&self.task_ids, &self.updates);
        Ok(())
    }

    /// Restore the prior values, then the order of the vacated columns.
    ///
    /// Every call that succeeds is mirrored into the store right away, so a
    /// failure part way leaves local and server agreeing and the undo can be
    /// retried as a whole.
    async fn undo(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        let groups: Vec<&PriorGroup> = self.groups_to_restore().collect();
        let restores = groups.iter().map(|group| {
            ctx.gateway
                .bulk_update_tasks(&ctx.project_id, &group.task_ids, group.values)
        });
        let results = join_all(restores).await;
        {
            let mut store = ctx.store.write().await;
            for (group, result) in groups.iter().zip(&results) {
                if result.is_ok() {
                    store.bulk_update(&group.task_ids, &group.values);
                }
            }
        }
        first_error(results)?;

        let reorders = self
            .vacated_columns
            .iter()
            .map(|(column, order)| reorder_remote(ctx, *column, order));
        let results = join_all(reorders).await;
        {
            let mut store = ctx.store.write().await;
            for ((column, order), result) in self.vacated_columns.iter().zip(&results) {
                if result.is_ok() {
                    store.reorder_column(*column, order);
                }
            }
        }
        first_error(results)
    }

    fn description(&self) -> String {
        let mut changes = Vec::new();
        if let Some(status) = self.updates.status {
            changes.push(format!("status {}", status));
        }
        if let Some(priority) = self.updates.priority {
            changes.push(format!("priority {}", priority));
        }
        format!(
            "Set {} on {} tasks",
            changes.join(" and "),
            self.task_ids.len()
        )
    }

    fn kind(&self) -> CommandKind {
        CommandKind::BulkUpdate
    }

    fn touched_tasks(&self) -> Vec<TaskId> {
        let mut ids = self.task_ids.clone();
        for (_, order) in &self.vacated_columns {
            for id in order {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }
}
