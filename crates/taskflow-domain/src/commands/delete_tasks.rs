use super::{require_ids, require_task, Command, CommandContext, CommandKind};
use crate::{NewTask, Task, TaskId, TaskPlacement, TaskStore};
use async_trait::async_trait;
use futures::future::join_all;
use taskflow_core::TaskflowResult;

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteTasksParams {
    pub task_ids: Vec<TaskId>,
}

impl DeleteTasksParams {
    pub fn new(task_ids: Vec<TaskId>) -> Self {
        Self { task_ids }
    }

    pub fn single(task_id: impl Into<TaskId>) -> Self {
        Self::new(vec![task_id.into()])
    }

    pub(crate) fn validate(&self) -> TaskflowResult<()> {
        require_ids(&self.task_ids, "Delete")
    }
}

/// Delete one or more tasks. The snapshot is the full copy of every task,
/// which undo sends back to the server as recreate requests.
pub struct DeleteTasksCommand {
    snapshots: Vec<Task>,
}

impl DeleteTasksCommand {
    pub(crate) fn prepare(params: DeleteTasksParams, store: &TaskStore) -> TaskflowResult<Self> {
        let snapshots = params
            .task_ids
            .iter()
            .map(|id| require_task(store, id).cloned())
            .collect::<TaskflowResult<Vec<_>>>()?;
        Ok(Self { snapshots })
    }

    fn ids(&self) -> Vec<TaskId> {
        self.snapshots.iter().map(|t| t.id.clone()).collect()
    }
}

#[async_trait]
impl Command for DeleteTasksCommand {
    async fn execute(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        let ids = self.ids();
        match ids.as_slice() {
            [id] => ctx.gateway.delete_task(&ctx.project_id, id).await?,
            _ => ctx.gateway.delete_tasks(&ctx.project_id, &ids).await?,
        }

        ctx.store.write().await.delete_tasks(&ids);
        Ok(())
    }

    /// Recreate every task the server does not hold again yet.
    ///
    /// Each recreate that lands is mirrored even when another one fails, so
    /// a retry only sends the ones still missing.
    async fn undo(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        let pending: Vec<&Task> = {
            let store = ctx.store.read().await;
            self.snapshots
                .iter()
                .filter(|task| !store.contains(&task.id))
                .collect()
        };

        let requests = pending.iter().map(|task| {
            ctx.gateway
                .create_task(&ctx.project_id, NewTask::recreate(task))
        });
        let results = join_all(requests).await;

        let mut first_error = None;
        let mut store = ctx.store.write().await;
        for result in results {
            match result {
                Ok(task) => {
                    let placement = TaskPlacement::from_task(&task);
                    store.create_task(task, placement);
                }
                Err(e) => {
                    tracing::warn!("Recreate failed during undo: {}", e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn description(&self) -> String {
        match self.snapshots.as_slice() {
            [task] => format!("Delete task '{}'", task.title),
            tasks => format!("Delete {} tasks", tasks.len()),
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Delete
    }

    fn touched_tasks(&self) -> Vec<TaskId> {
        self.ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context_with, snapshot};
    use crate::gateway::MockTaskGateway;
    use crate::positions::{column_order, ColumnKey};
    use crate::TaskPriority;
    use mockall::predicate::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use taskflow_core::TaskflowError;

    fn board() -> Vec<Task> {
        ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let mut task = Task::new("p1", *title)
                    .with_id(title.to_lowercase())
                    .with_priority(TaskPriority::High);
                task.position = i as i64;
                task.status_position = i as i64;
                task
            })
            .collect()
    }

    fn recreate_echo(_: &str, request: NewTask) -> TaskflowResult<Task> {
        Ok(Task::from_new("p1", request))
    }

    #[tokio::test]
    async fn test_single_delete_uses_single_call() {
        let mut mock = MockTaskGateway::new();
        mock.expect_delete_task()
            .with(eq("p1"), eq("b"))
            .times(1)
            .returning(|_, _| Ok(()));
        mock.expect_delete_tasks().never();

        let ctx = context_with(mock, board());
        let params = DeleteTasksParams::single("b");
        let mut cmd = DeleteTasksCommand::prepare(params, &*ctx.store.read().await).unwrap();
        assert_eq!(cmd.description(), "Delete task 'B'");

        cmd.execute(&ctx).await.unwrap();
        assert_eq!(snapshot(&ctx).await.len(), 2);
    }

    #[tokio::test]
    async fn test_undo_recreates_every_task_in_place() {
        let mut mock = MockTaskGateway::new();
        mock.expect_delete_tasks()
            .times(1)
            .returning(|_, _| Ok(()));
        mock.expect_create_task()
            .with(eq("p1"), function(|r: &NewTask| r.id.is_some()))
            .times(2)
            .returning(recreate_echo);

        let ctx = context_with(mock, board());
        let params = DeleteTasksParams::new(vec!["a".to_string(), "c".to_string()]);
        let mut cmd = DeleteTasksCommand::prepare(params, &*ctx.store.read().await).unwrap();
        assert_eq!(cmd.description(), "Delete 2 tasks");

        cmd.execute(&ctx).await.unwrap();
        assert_eq!(snapshot(&ctx).await.len(), 1);

        cmd.undo(&ctx).await.unwrap();
        let tasks = snapshot(&ctx).await;
        assert_eq!(
            column_order(&tasks, ColumnKey::Priority(TaskPriority::High)),
            ["a", "b", "c"]
        );
    }

    #[tokio::test]
    async fn test_partial_recreate_failure_keeps_landed_tasks_and_retries_the_rest() {
        let c_attempts = Arc::new(AtomicUsize::new(0));
        let attempts = c_attempts.clone();

        let mut mock = MockTaskGateway::new();
        mock.expect_delete_tasks().returning(|_, _| Ok(()));
        mock.expect_create_task()
            .with(eq("p1"), function(|r: &NewTask| r.id.as_deref() == Some("a")))
            .times(1)
            .returning(recreate_echo);
        mock.expect_create_task()
            .with(eq("p1"), function(|r: &NewTask| r.id.as_deref() == Some("c")))
            .times(2)
            .returning(move |_, request| {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(TaskflowError::Gateway("timeout".into()))
                } else {
                    Ok(Task::from_new("p1", request))
                }
            });

        let ctx = context_with(mock, board());
        let params = DeleteTasksParams::new(vec!["a".to_string(), "c".to_string()]);
        let mut cmd = DeleteTasksCommand::prepare(params, &*ctx.store.read().await).unwrap();

        cmd.execute(&ctx).await.unwrap();
        let err = cmd.undo(&ctx).await.unwrap_err();
        assert!(matches!(err, TaskflowError::Gateway(_)));
        let ids: Vec<TaskId> = snapshot(&ctx).await.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["b", "a"]);

        cmd.undo(&ctx).await.unwrap();
        let tasks = snapshot(&ctx).await;
        assert_eq!(
            column_order(&tasks, ColumnKey::Priority(TaskPriority::High)),
            ["a", "b", "c"]
        );
        assert_eq!(c_attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_prepare_fails_on_unknown_id() {
        let mut store = TaskStore::new();
        store.load_tasks(board());
        let params = DeleteTasksParams::new(vec!["a".to_string(), "zzz".to_string()]);
        assert!(DeleteTasksCommand::prepare(params, &store).is_err());
    }
}
