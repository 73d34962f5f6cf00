//! JSON scripts driving a session step by step.
//!
//! Steps refer to tasks by their current title; ids are generated by the
//! server and are not known when a script is written.

use serde::Deserialize;
use std::path::Path;
use taskflow_core::{TaskflowError, TaskflowResult};
use taskflow_domain::{
    BulkUpdate, BulkUpdateParams, ColumnKey, CreateTaskParams, DeleteTasksParams, FieldUpdate,
    GatewayOp, MoveTaskParams, NewTask, ReorderTasksParams, Task, TaskCommand, TaskId,
    TaskPriority, TaskStatus, TaskUpdate, UpdateTaskParams,
};

fn default_project() -> String {
    "default".to_string()
}

fn default_editor() -> String {
    "someone-else".to_string()
}

fn one() -> usize {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default = "default_project")]
    pub project: String,
    /// Tasks the server already holds when the script starts.
    #[serde(default)]
    pub seed: Vec<SeedTask>,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read script {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        serde_json::from_str(content).map_err(|e| anyhow::anyhow!("Invalid script: {}", e))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
}

impl From<SeedTask> for NewTask {
    fn from(seed: SeedTask) -> Self {
        let mut task = NewTask::new(seed.title);
        task.description = seed.description;
        if let Some(status) = seed.status {
            task.status = status;
        }
        if let Some(priority) = seed.priority {
            task.priority = priority;
        }
        task
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Create {
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        status: Option<TaskStatus>,
        #[serde(default)]
        priority: Option<TaskPriority>,
    },
    Update {
        task: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        status: Option<TaskStatus>,
        #[serde(default)]
        priority: Option<TaskPriority>,
    },
    Delete {
        tasks: Vec<String>,
    },
    Bulk {
        tasks: Vec<String>,
        #[serde(default)]
        status: Option<TaskStatus>,
        #[serde(default)]
        priority: Option<TaskPriority>,
    },
    Reorder {
        column: ColumnKey,
        tasks: Vec<String>,
    },
    Move {
        task: String,
        to: ColumnKey,
        #[serde(default)]
        index: Option<usize>,
    },
    Undo,
    Redo,
    Clear,
    /// Another user edits a task on the server behind this session's back.
    ExternalEdit {
        task: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        status: Option<TaskStatus>,
        #[serde(default)]
        priority: Option<TaskPriority>,
        #[serde(default = "default_editor")]
        editor: String,
    },
    /// Make the next `times` calls of one gateway operation fail.
    ///
    /// Without a message the calls fail with a version conflict.
    Fail {
        gateway: GatewayOp,
        #[serde(default = "one")]
        times: usize,
        #[serde(default)]
        message: Option<String>,
    },
    Switch {
        project: String,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Bulk { .. } => "bulk",
            Self::Reorder { .. } => "reorder",
            Self::Move { .. } => "move",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Clear => "clear",
            Self::ExternalEdit { .. } => "external_edit",
            Self::Fail { .. } => "fail",
            Self::Switch { .. } => "switch",
        }
    }

    /// The undoable command this step stands for, resolved against `tasks`.
    ///
    /// `None` for steps that drive the session or the server directly.
    pub fn to_command(&self, tasks: &[Task]) -> TaskflowResult<Option<TaskCommand>> {
        let command = match self {
            Self::Create {
                title,
                description,
                status,
                priority,
            } => {
                let mut params = CreateTaskParams::new(title.clone());
                if let Some(description) = description {
                    params = params.with_description(description.clone());
                }
                if let Some(status) = status {
                    params = params.with_status(*status);
                }
                if let Some(priority) = priority {
                    params = params.with_priority(*priority);
                }
                TaskCommand::create(params)?
            }
            Self::Update {
                task,
                title,
                description,
                status,
                priority,
            } => {
                let updates = TaskUpdate {
                    title: title.clone(),
                    description: description
                        .clone()
                        .map_or(FieldUpdate::NoChange, FieldUpdate::Set),
                    status: *status,
                    priority: *priority,
                    ..Default::default()
                };
                TaskCommand::update(UpdateTaskParams::new(resolve(tasks, task)?, updates))?
            }
            Self::Delete { tasks: titles } => {
                TaskCommand::delete(DeleteTasksParams::new(resolve_all(tasks, titles)?))?
            }
            Self::Bulk {
                tasks: titles,
                status,
                priority,
            } => {
                let updates = BulkUpdate {
                    status: *status,
                    priority: *priority,
                };
                TaskCommand::bulk_update(BulkUpdateParams::new(resolve_all(tasks, titles)?, updates))?
            }
            Self::Reorder {
                column,
                tasks: titles,
            } => TaskCommand::reorder(ReorderTasksParams::new(*column, resolve_all(tasks, titles)?))?,
            Self::Move { task, to, index } => {
                let mut params = MoveTaskParams::new(resolve(tasks, task)?, *to);
                if let Some(index) = index {
                    params = params.at(*index);
                }
                TaskCommand::move_task(params)?
            }
            Self::Undo
            | Self::Redo
            | Self::Clear
            | Self::ExternalEdit { .. }
            | Self::Fail { .. }
            | Self::Switch { .. } => return Ok(None),
        };
        Ok(Some(command))
    }
}

/// Id of the first task whose title matches exactly.
pub fn resolve(tasks: &[Task], title: &str) -> TaskflowResult<TaskId> {
    tasks
        .iter()
        .find(|t| t.title == title)
        .map(|t| t.id.clone())
        .ok_or_else(|| TaskflowError::NotFound(format!("task titled '{}'", title)))
}

pub fn resolve_all(tasks: &[Task], titles: &[String]) -> TaskflowResult<Vec<TaskId>> {
    titles.iter().map(|title| resolve(tasks, title)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskflow_domain::CommandKind;

    fn board() -> Vec<Task> {
        vec![
            Task::new("p1", "Write spec").with_id("t1"),
            Task::new("p1", "Review").with_id("t2"),
        ]
    }

    #[test]
    fn test_parse_tagged_steps() {
        let script = Script::parse(
            r#"{
                "project": "p1",
                "seed": [{"title": "Review", "priority": "high"}],
                "steps": [
                    {"op": "create", "title": "Write spec", "priority": "low"},
                    {"op": "move", "task": "Review", "to": {"axis": "status", "value": "completed"}, "index": 0},
                    {"op": "fail", "gateway": "delete_task"},
                    {"op": "undo"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(script.project, "p1");
        assert_eq!(script.seed[0].priority, Some(TaskPriority::High));
        let names: Vec<&str> = script.steps.iter().map(Step::name).collect();
        assert_eq!(names, ["create", "move", "fail", "undo"]);
        assert!(matches!(
            script.steps[2],
            Step::Fail {
                gateway: GatewayOp::DeleteTask,
                times: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        let err = Script::parse(r#"{"steps": [{"op": "archive"}]}"#).unwrap_err();
        assert!(err.to_string().starts_with("Invalid script"));
    }

    #[test]
    fn test_titles_resolve_to_ids() {
        let step = Step::Delete {
            tasks: vec!["Review".into(), "Write spec".into()],
        };
        let command = step.to_command(&board()).unwrap().unwrap();
        assert_eq!(command.kind(), CommandKind::Delete);

        let missing = Step::Update {
            task: "Nope".into(),
            title: Some("x".into()),
            description: None,
            status: None,
            priority: None,
        };
        let err = missing.to_command(&board()).unwrap_err();
        assert!(matches!(err, TaskflowError::NotFound(_)));
    }

    #[test]
    fn test_control_steps_have_no_command() {
        assert!(Step::Undo.to_command(&board()).unwrap().is_none());
        assert!(Step::Clear.to_command(&board()).unwrap().is_none());
    }

    #[test]
    fn test_seed_defaults() {
        let task: NewTask = SeedTask {
            title: "A".into(),
            description: None,
            status: None,
            priority: None,
        }
        .into();
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.priority, TaskPriority::None);
    }
}
