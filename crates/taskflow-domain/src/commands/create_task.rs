use super::{Command, CommandContext, CommandKind};
use crate::{CustomFields, NewTask, Task, TaskId, TaskPlacement, TaskPriority, TaskStatus};
use async_trait::async_trait;
use taskflow_core::{TaskflowError, TaskflowResult};

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTaskParams {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Explicit priority-column position; appended when `None`.
    pub position: Option<i64>,
    pub custom_fields: CustomFields,
}

impl CreateTaskParams {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TaskStatus::NotStarted,
            priority: TaskPriority::None,
            position: None,
            custom_fields: CustomFields::new(),
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub(crate) fn validate(&self) -> TaskflowResult<()> {
        if self.title.trim().is_empty() {
            return Err(TaskflowError::Validation("Task title cannot be empty".into()));
        }
        Ok(())
    }

    fn request(&self) -> NewTask {
        NewTask {
            id: None,
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            priority: self.priority,
            position: self.position,
            status_position: None,
            custom_fields: self.custom_fields.clone(),
        }
    }
}

/// Create a task. Undo deletes it; redo recreates it under the same id and
/// positions the server assigned the first time.
pub struct CreateTaskCommand {
    params: CreateTaskParams,
    created: Option<Task>,
}

impl CreateTaskCommand {
    pub(crate) fn prepare(params: CreateTaskParams) -> Self {
        Self {
            params,
            created: None,
        }
    }

    /// Id of the created task, once the first execute has succeeded.
    pub fn created_id(&self) -> Option<&TaskId> {
        self.created.as_ref().map(|task| &task.id)
    }
}

#[async_trait]
impl Command for CreateTaskCommand {
    async fn execute(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        let request = match &self.created {
            Some(previous) => NewTask::recreate(previous),
            None => self.params.request(),
        };

        let task = ctx.gateway.create_task(&ctx.project_id, request).await?;
        tracing::debug!("Created task {} ({})", task.id, task.title);

        let mut store = ctx.store.write().await;
        store.create_task(task.clone(), TaskPlacement::from_task(&task));
        self.created = Some(task);
        Ok(())
    }

    async fn undo(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        let id = self
            .created
            .as_ref()
            .map(|task| task.id.clone())
            .ok_or(TaskflowError::MissingCreatedId)?;

        ctx.gateway.delete_task(&ctx.project_id, &id).await?;
        ctx.store.write().await.delete_task(&id);
        Ok(())
    }

    fn description(&self) -> String {
        format!("Create task '{}'", self.params.title)
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Create
    }

    fn touched_tasks(&self) -> Vec<TaskId> {
        self.created_id().cloned().into_iter().collect()
    }
}
