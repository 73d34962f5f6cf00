use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Optimistic-concurrency conflict reported for a single task.
///
/// Carried as data so a higher layer can present a merge view instead of
/// treating the conflict as a generic failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionConflict {
    pub task_id: String,
    pub expected_version: u64,
    pub current_version: u64,
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Version conflict on task {}: expected version {}, found {}",
            self.task_id, self.expected_version, self.current_version
        )
    }
}

#[derive(Error, Debug)]
pub enum TaskflowError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("{0}")]
    VersionConflict(VersionConflict),

    #[error("No commands to undo")]
    NothingToUndo,

    #[error("No commands to redo")]
    NothingToRedo,

    #[error("Cannot undo: no id captured")]
    MissingCreatedId,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TaskflowError {
    /// Empty-stack rejections are expected; callers render them as disabled controls.
    pub fn is_empty_stack(&self) -> bool {
        matches!(self, Self::NothingToUndo | Self::NothingToRedo)
    }

    pub fn conflict(&self) -> Option<&VersionConflict> {
        match self {
            Self::VersionConflict(conflict) => Some(conflict),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stack_messages() {
        assert_eq!(TaskflowError::NothingToUndo.to_string(), "No commands to undo");
        assert_eq!(TaskflowError::NothingToRedo.to_string(), "No commands to redo");
        assert!(TaskflowError::NothingToUndo.is_empty_stack());
        assert!(!TaskflowError::Gateway("down".into()).is_empty_stack());
    }

    #[test]
    fn test_conflict_is_typed() {
        let err = TaskflowError::VersionConflict(VersionConflict {
            task_id: "t-1".to_string(),
            expected_version: 3,
            current_version: 5,
        });

        let conflict = err.conflict().unwrap();
        assert_eq!(conflict.current_version, 5);
        assert_eq!(
            err.to_string(),
            "Version conflict on task t-1: expected version 3, found 5"
        );
    }
}
