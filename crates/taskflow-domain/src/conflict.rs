//! Optimistic concurrency check before undo and redo.
//!
//! Undoing a command rewrites server state from a snapshot. If a
//! collaborator changed one of the affected tasks in the meantime, the
//! rewrite would silently discard their edit. The guard compares the version
//! this session last saw for each task with the server's current version and
//! reports the first mismatch as a typed conflict.

use crate::commands::CommandContext;
use crate::TaskId;
use futures::future::try_join_all;
use taskflow_core::{TaskflowError, TaskflowResult, VersionConflict};

pub struct VersionGuard;

impl VersionGuard {
    /// Versions the local store holds for `task_ids`; ids it lacks are skipped.
    pub async fn local_versions(ctx: &CommandContext, task_ids: &[TaskId]) -> Vec<(TaskId, u64)> {
        let store = ctx.store.read().await;
        task_ids
            .iter()
            .filter_map(|id| store.get(id).map(|task| (id.clone(), task.version)))
            .collect()
    }

    /// Fail with [`TaskflowError::VersionConflict`] if the server moved on.
    ///
    /// Tasks missing locally or remotely are not checked: a deleted task is
    /// exactly what an undo of a create or delete expects to find.
    pub async fn verify(ctx: &CommandContext, task_ids: &[TaskId]) -> TaskflowResult<()> {
        let expected = Self::local_versions(ctx, task_ids).await;
        if expected.is_empty() {
            return Ok(());
        }

        let fetches = expected
            .iter()
            .map(|(id, _)| ctx.gateway.fetch_task(&ctx.project_id, id));
        let current = try_join_all(fetches).await?;

        for ((task_id, expected_version), server) in expected.into_iter().zip(current) {
            let Some(server) = server else {
                continue;
            };
            if server.version != expected_version {
                tracing::warn!(
                    "Version conflict on {}: local {}, server {}",
                    task_id,
                    expected_version,
                    server.version
                );
                return Err(TaskflowError::VersionConflict(VersionConflict {
                    task_id,
                    expected_version,
                    current_version: server.version,
                }));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context_with;
    use crate::gateway::MockTaskGateway;
    use crate::Task;
    use mockall::predicate::*;

    fn local(id: &str, version: u64) -> Task {
        let mut task = Task::new("p1", id).with_id(id);
        task.version = version;
        task
    }

    #[tokio::test]
    async fn test_matching_versions_pass() {
        let mut mock = MockTaskGateway::new();
        mock.expect_fetch_task()
            .with(eq("p1"), eq("a"))
            .returning(|_, id| Ok(Some(local(id, 3))));

        let ctx = context_with(mock, vec![local("a", 3)]);
        VersionGuard::verify(&ctx, &["a".to_string()]).await.unwrap();
    }

    #[tokio::test]
    async fn test_newer_server_version_is_conflict() {
        let mut mock = MockTaskGateway::new();
        mock.expect_fetch_task()
            .returning(|_, id| Ok(Some(local(id, if id == "b" { 5 } else { 1 }))));

        let ctx = context_with(mock, vec![local("a", 1), local("b", 4)]);
        let err = VersionGuard::verify(&ctx, &["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();

        let conflict = err.conflict().cloned().unwrap();
        assert_eq!(conflict.task_id, "b");
        assert_eq!(conflict.expected_version, 4);
        assert_eq!(conflict.current_version, 5);
    }

    #[tokio::test]
    async fn test_tasks_missing_on_either_side_are_skipped() {
        let mut mock = MockTaskGateway::new();
        mock.expect_fetch_task()
            .with(eq("p1"), eq("a"))
            .times(1)
            .returning(|_, _| Ok(None));

        let ctx = context_with(mock, vec![local("a", 2)]);
        VersionGuard::verify(&ctx, &["a".to_string(), "gone".to_string()])
            .await
            .unwrap();
    }
}
