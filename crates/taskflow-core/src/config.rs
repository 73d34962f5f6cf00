use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{TaskflowError, TaskflowResult};

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskflowConfig {
    /// Maximum number of entries kept on each of the undo and redo stacks.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Compare task versions with the server before every undo/redo.
    #[serde(default)]
    pub verify_versions: bool,

    /// Identity recorded as `updated_by` on mutations.
    #[serde(default)]
    pub actor: Option<String>,
}

impl Default for TaskflowConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            verify_versions: false,
            actor: None,
        }
    }
}

impl TaskflowConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/taskflow/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("taskflow/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("taskflow\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Load from the platform config path, falling back to defaults.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| Self::load_from(&path).ok())
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> TaskflowResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> TaskflowResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| TaskflowError::Serialization(format!("Invalid config: {}", e)))?;
        config.validated()
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    fn validated(self) -> TaskflowResult<Self> {
        if self.history_capacity == 0 {
            return Err(TaskflowError::Validation(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}
