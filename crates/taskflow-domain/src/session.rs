//! One signed-in user's view of one project.
//!
//! A session ties a [`CommandContext`] to its [`CommandHistory`] so that the
//! history can never outlive the store it was recorded against: switching
//! project or logging out resets both together.

use crate::commands::{CommandContext, TaskCommand};
use crate::gateway::TaskGateway;
use crate::history::CommandHistory;
use crate::{ProjectId, Task};
use std::sync::Arc;
use taskflow_core::{TaskflowConfig, TaskflowError, TaskflowResult};

pub struct ProjectSession {
    context: CommandContext,
    history: CommandHistory,
    config: TaskflowConfig,
}

impl ProjectSession {
    pub fn new(
        project_id: impl Into<ProjectId>,
        gateway: Arc<dyn TaskGateway>,
        config: TaskflowConfig,
    ) -> TaskflowResult<Self> {
        let project_id = project_id.into();
        if project_id.trim().is_empty() {
            return Err(TaskflowError::Validation("No project selected".into()));
        }
        Ok(Self {
            context: CommandContext::new(project_id, gateway),
            history: CommandHistory::from_config(&config),
            config,
        })
    }

    /// Fetch the project's tasks into the store.
    ///
    /// Not undoable and leaves the store's undo descriptor empty.
    pub async fn load(&mut self) -> TaskflowResult<usize> {
        let tasks = self
            .context
            .gateway
            .fetch_tasks(&self.context.project_id)
            .await?;
        let count = tasks.len();
        self.context.store.write().await.load_tasks(tasks);
        tracing::info!("Loaded {} tasks for project {}", count, self.context.project_id);
        Ok(count)
    }

    pub async fn execute(&mut self, command: TaskCommand) -> TaskflowResult<()> {
        self.history.execute_command(&self.context, command).await
    }

    pub async fn undo(&mut self) -> TaskflowResult<()> {
        self.history.undo_last_command(&self.context).await
    }

    pub async fn redo(&mut self) -> TaskflowResult<()> {
        self.history.redo_last_command(&self.context).await
    }

    /// Forget every recorded command; the board stays as it is.
    pub fn clear_history(&mut self) {
        self.history.clear_history();
    }

    /// Drop the current project's state and history, then load `project_id`.
    pub async fn switch_project(&mut self, project_id: impl Into<ProjectId>) -> TaskflowResult<usize> {
        let project_id = project_id.into();
        if project_id.trim().is_empty() {
            return Err(TaskflowError::Validation("No project selected".into()));
        }
        tracing::info!("Switching project {} -> {}", self.context.project_id, project_id);
        self.reset().await;
        self.context.project_id = project_id;
        self.load().await
    }

    /// Forget every task and command; the session keeps its gateway.
    pub async fn logout(&mut self) {
        tracing::info!("Clearing session for project {}", self.context.project_id);
        self.reset().await;
    }

    async fn reset(&mut self) {
        self.context.store.write().await.clear();
        self.history = CommandHistory::from_config(&self.config);
    }

    pub fn project_id(&self) -> &str {
        &self.context.project_id
    }

    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Copy of the store's tasks, in store order.
    pub async fn tasks(&self) -> Vec<Task> {
        self.context.store.read().await.tasks().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CreateTaskParams;
    use crate::gateway::MockTaskGateway;
    use mockall::predicate::*;

    fn gateway() -> MockTaskGateway {
        let mut mock = MockTaskGateway::new();
        mock.expect_fetch_tasks()
            .with(eq("p1"))
            .returning(|_| Ok(vec![Task::new("p1", "Loaded").with_id("l1")]));
        mock.expect_fetch_tasks()
            .with(eq("p2"))
            .returning(|_| Ok(Vec::new()));
        mock.expect_create_task()
            .returning(|project, request| Ok(Task::from_new(project, request).with_id("n1")));
        mock
    }

    #[test]
    fn test_requires_project() {
        let result = ProjectSession::new(" ", Arc::new(MockTaskGateway::new()), TaskflowConfig::default());
        assert!(matches!(result, Err(TaskflowError::Validation(_))));
    }

    #[tokio::test]
    async fn test_load_is_not_undoable() {
        let mut session = ProjectSession::new("p1", Arc::new(gateway()), TaskflowConfig::default()).unwrap();

        assert_eq!(session.load().await.unwrap(), 1);
        assert!(!session.history().can_undo());
        assert!(session.context().store.read().await.last_mutation().is_none());
        assert!(matches!(session.undo().await, Err(TaskflowError::NothingToUndo)));
    }

    #[tokio::test]
    async fn test_switch_project_resets_history() {
        let mut session = ProjectSession::new("p1", Arc::new(gateway()), TaskflowConfig::default()).unwrap();
        session.load().await.unwrap();
        session
            .execute(TaskCommand::create(CreateTaskParams::new("New")).unwrap())
            .await
            .unwrap();
        assert_eq!(session.tasks().await.len(), 2);

        assert_eq!(session.switch_project("p2").await.unwrap(), 0);
        assert_eq!(session.project_id(), "p2");
        assert!(session.tasks().await.is_empty());
        assert!(!session.history().can_undo());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let mut session = ProjectSession::new("p1", Arc::new(gateway()), TaskflowConfig::default()).unwrap();
        session.load().await.unwrap();
        session
            .execute(TaskCommand::create(CreateTaskParams::new("New")).unwrap())
            .await
            .unwrap();

        session.logout().await;
        assert!(session.tasks().await.is_empty());
        assert_eq!(session.history().undo_depth(), 0);
    }
}
