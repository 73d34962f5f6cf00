use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use taskflow_core::TaskflowError;
use uuid::Uuid;

pub type TaskId = String;
pub type ProjectId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::NotStarted, Self::InProgress, Self::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "notstarted" | "todo" => Ok(Self::NotStarted),
            "inprogress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            _ => Err(TaskflowError::Validation(format!("Unknown status: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    None,
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 5] = [
        Self::None,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = TaskflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(TaskflowError::Validation(format!("Unknown priority: {}", s))),
        }
    }
}

/// Value of a user-defined custom field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomFieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

pub type CustomFields = BTreeMap<String, CustomFieldValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub position: i64,
    pub status_position: i64,
    #[serde(default)]
    pub custom_fields: CustomFields,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl Task {
    /// Build a fresh task with version 1 and a generated id.
    pub fn new(project_id: impl Into<ProjectId>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            title: title.into(),
            description: None,
            status: TaskStatus::NotStarted,
            priority: TaskPriority::None,
            position: 0,
            status_position: 0,
            custom_fields: CustomFields::new(),
            version: 1,
            created_at: now,
            updated_at: now,
            updated_by: None,
        }
    }

    /// Materialize the fields of a create request into a task.
    ///
    /// Positions are left at zero; the store assigns them on insert.
    pub fn from_new(project_id: impl Into<ProjectId>, new_task: NewTask) -> Self {
        let mut task = Self::new(project_id, new_task.title);
        if let Some(id) = new_task.id {
            task.id = id;
        }
        task.description = new_task.description;
        task.status = new_task.status;
        task.priority = new_task.priority;
        task.position = new_task.position.unwrap_or_default();
        task.status_position = new_task.status_position.unwrap_or_default();
        task.custom_fields = new_task.custom_fields;
        task
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Compare user-visible content, ignoring version and audit fields.
    ///
    /// Undo replays are new server mutations, so versions and timestamps
    /// never match the pre-command state even when the content does.
    pub fn same_content(&self, other: &Task) -> bool {
        self.id == other.id
            && self.project_id == other.project_id
            && self.title == other.title
            && self.description == other.description
            && self.status == other.status
            && self.priority == other.priority
            && self.position == other.position
            && self.status_position == other.status_position
            && self.custom_fields == other.custom_fields
    }
}

/// Fields of a create request sent to the gateway.
///
/// `id` is only supplied when recreating a deleted task during undo, so the
/// task keeps its identity across delete → undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub status_position: Option<i64>,
    #[serde(default)]
    pub custom_fields: CustomFields,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: None,
            status: TaskStatus::NotStarted,
            priority: TaskPriority::None,
            position: None,
            status_position: None,
            custom_fields: CustomFields::new(),
        }
    }

    /// Recreate request carrying every field of a previously deleted task.
    pub fn recreate(task: &Task) -> Self {
        Self {
            id: Some(task.id.clone()),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            position: Some(task.position),
            status_position: Some(task.status_position),
            custom_fields: task.custom_fields.clone(),
        }
    }
}
