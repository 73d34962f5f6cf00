use crate::{CustomFields, FieldUpdate, Task, TaskPriority, TaskStatus};
use serde::{Deserialize, Serialize};
use taskflow_core::Editable;

/// Partial update of a task.
///
/// `version` and `updated_by` are only set when stamping server-returned
/// state into the local store; a local mutation without an explicit version
/// bumps the version by one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<CustomFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl TaskUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && !self.description.is_change()
            && self.status.is_none()
            && self.priority.is_none()
            && self.position.is_none()
            && self.status_position.is_none()
            && self.custom_fields.is_none()
            && self.version.is_none()
            && self.updated_by.is_none()
    }

    /// Capture the current values of exactly the fields this update touches.
    ///
    /// A priority (status) change also captures the prior position (status
    /// position), since the store re-places the task in its new column.
    pub fn prior_values(&self, task: &Task) -> TaskUpdate {
        let priority_changes = self.priority.is_some_and(|p| p != task.priority);
        let status_changes = self.status.is_some_and(|s| s != task.status);

        TaskUpdate {
            title: self.title.as_ref().map(|_| task.title.clone()),
            description: self.description.inverse_of(&task.description),
            status: self.status.map(|_| task.status),
            priority: self.priority.map(|_| task.priority),
            position: (self.position.is_some() || priority_changes).then_some(task.position),
            status_position: (self.status_position.is_some() || status_changes)
                .then_some(task.status_position),
            custom_fields: self.custom_fields.as_ref().map(|_| task.custom_fields.clone()),
            version: None,
            updated_by: None,
        }
    }

    /// Only the server-owned fields of a returned task.
    pub fn server_stamp(task: &Task) -> TaskUpdate {
        TaskUpdate {
            version: Some(task.version),
            updated_by: task.updated_by.clone(),
            ..Default::default()
        }
    }
}

impl Editable<Task> for TaskUpdate {
    /// Every mutable field of the task, version included.
    fn from_entity(task: &Task) -> Self {
        Self {
            title: Some(task.title.clone()),
            description: task.description.clone().into(),
            status: Some(task.status),
            priority: Some(task.priority),
            position: Some(task.position),
            status_position: Some(task.status_position),
            custom_fields: Some(task.custom_fields.clone()),
            version: Some(task.version),
            updated_by: task.updated_by.clone(),
        }
    }

    fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        self.description.apply_to(&mut task.description);
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(position) = self.position {
            task.position = position;
        }
        if let Some(status_position) = self.status_position {
            task.status_position = status_position;
        }
        if let Some(custom_fields) = self.custom_fields {
            task.custom_fields = custom_fields;
        }
        match self.version {
            Some(version) => task.version = version,
            None => task.version += 1,
        }
        if self.updated_by.is_some() {
            task.updated_by = self.updated_by;
        }
        task.touch();
    }
}

/// The fields a bulk operation may change on many tasks at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
}

impl BulkUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            priority: None,
        }
    }

    pub fn priority(priority: TaskPriority) -> Self {
        Self {
            status: None,
            priority: Some(priority),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none()
    }

    /// The subset of `task`'s current values that this bulk update would overwrite.
    pub fn prior_of(&self, task: &Task) -> BulkUpdate {
        BulkUpdate {
            status: self.status.map(|_| task.status),
            priority: self.priority.map(|_| task.priority),
        }
    }
}
