//! Undo/redo history for task commands.
//!
//! Commands are prepared, executed, and kept on bounded undo/redo stacks.
//! Only a command whose execute (or undo) succeeded ever moves between
//! stacks, so a failed gateway call leaves both the store and the history
//! as they were.

use crate::commands::{Command, CommandContext, PreparedCommand, TaskCommand};
use crate::conflict::VersionGuard;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use taskflow_core::{Activity, LogEntry, Loggable, TaskflowConfig, TaskflowError, TaskflowResult};

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Sets the shared executing flag for as long as it lives.
struct ExecutingGuard(Arc<AtomicBool>);

impl ExecutingGuard {
    fn engage(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(Arc::clone(flag))
    }
}

impl Drop for ExecutingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Bounded undo/redo stacks of prepared commands.
///
/// Methods take `&mut self`, so one history never runs two commands at
/// once. The executing flag is still exposed through [`executing_flag`]
/// for UI code that wants to disable buttons while a call is in flight.
///
/// [`executing_flag`]: CommandHistory::executing_flag
#[derive(Debug)]
pub struct CommandHistory {
    /// Most recent = back of deque.
    undo_stack: VecDeque<PreparedCommand>,

    /// Most recent = back of deque.
    redo_stack: VecDeque<PreparedCommand>,

    capacity: usize,
    verify_versions: bool,
    executing: Arc<AtomicBool>,
    logs: Vec<LogEntry>,
}

impl CommandHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            capacity: capacity.max(1),
            verify_versions: false,
            executing: Arc::new(AtomicBool::new(false)),
            logs: Vec::new(),
        }
    }

    pub fn from_config(config: &TaskflowConfig) -> Self {
        Self::new(config.history_capacity).with_version_checks(config.verify_versions)
    }

    /// Check server versions of the touched tasks before every undo and redo.
    pub fn with_version_checks(mut self, enabled: bool) -> Self {
        self.verify_versions = enabled;
        self
    }

    /// Prepare `command` against the current store and execute it.
    ///
    /// On success the command is pushed onto the undo stack (evicting the
    /// oldest entry past capacity) and the redo stack is cleared. On failure
    /// nothing is pushed and the error is returned.
    pub async fn execute_command(
        &mut self,
        ctx: &CommandContext,
        command: TaskCommand,
    ) -> TaskflowResult<()> {
        let _executing = ExecutingGuard::engage(&self.executing);

        let prepared = {
            let store = ctx.store.read().await;
            command.prepare(&store)
        };
        let mut prepared = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                self.add_log(LogEntry::new(Activity::Failed, e.to_string()));
                return Err(e);
            }
        };

        let description = prepared.description();
        tracing::debug!("Executing: {}", description);
        if let Err(e) = prepared.execute(ctx).await {
            tracing::warn!("Command failed: {}: {}", description, e);
            self.add_log(LogEntry::new(Activity::Failed, format!("{}: {}", description, e)));
            return Err(e);
        }

        self.push_undo(prepared);
        self.redo_stack.clear();
        tracing::info!("Executed: {} (undo depth {})", description, self.undo_depth());
        self.add_log(LogEntry::new(Activity::Executed, description));
        Ok(())
    }

    /// Undo the most recent command.
    ///
    /// An empty stack is reported as [`TaskflowError::NothingToUndo`] without
    /// touching the gateway. A failed undo leaves the command on the undo stack.
    pub async fn undo_last_command(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        if self.undo_stack.is_empty() {
            return Err(TaskflowError::NothingToUndo);
        }
        let _executing = ExecutingGuard::engage(&self.executing);

        let result = match self.undo_stack.back_mut() {
            Some(command) => {
                tracing::debug!("Undoing: {}", command.description());
                Self::run_checked(ctx, command, self.verify_versions, Direction::Undo).await
            }
            None => Err(TaskflowError::NothingToUndo),
        };

        let description = self.next_undo_description().unwrap_or_default();
        if let Err(e) = result {
            tracing::warn!("Undo failed: {}: {}", description, e);
            self.add_log(LogEntry::new(Activity::Failed, format!("undo {}: {}", description, e)));
            return Err(e);
        }

        if let Some(command) = self.undo_stack.pop_back() {
            self.redo_stack.push_back(command);
        }
        tracing::info!("Undid: {}", description);
        self.add_log(LogEntry::new(Activity::Undone, description));
        Ok(())
    }

    /// Re-execute the most recently undone command.
    pub async fn redo_last_command(&mut self, ctx: &CommandContext) -> TaskflowResult<()> {
        if self.redo_stack.is_empty() {
            return Err(TaskflowError::NothingToRedo);
        }
        let _executing = ExecutingGuard::engage(&self.executing);

        let result = match self.redo_stack.back_mut() {
            Some(command) => {
                tracing::debug!("Redoing: {}", command.description());
                Self::run_checked(ctx, command, self.verify_versions, Direction::Redo).await
            }
            None => Err(TaskflowError::NothingToRedo),
        };

        let description = self.next_redo_description().unwrap_or_default();
        if let Err(e) = result {
            tracing::warn!("Redo failed: {}: {}", description, e);
            self.add_log(LogEntry::new(Activity::Failed, format!("redo {}: {}", description, e)));
            return Err(e);
        }

        if let Some(command) = self.redo_stack.pop_back() {
            self.push_undo(command);
        }
        tracing::info!("Redid: {}", description);
        self.add_log(LogEntry::new(Activity::Redone, description));
        Ok(())
    }

    async fn run_checked(
        ctx: &CommandContext,
        command: &mut PreparedCommand,
        verify_versions: bool,
        direction: Direction,
    ) -> TaskflowResult<()> {
        if verify_versions {
            VersionGuard::verify(ctx, &command.touched_tasks()).await?;
        }
        match direction {
            Direction::Undo => command.undo(ctx).await,
            Direction::Redo => command.execute(ctx).await,
        }
    }

    fn push_undo(&mut self, command: PreparedCommand) {
        self.undo_stack.push_back(command);
        while self.undo_stack.len() > self.capacity {
            if let Some(evicted) = self.undo_stack.pop_front() {
                tracing::debug!("History full, dropping oldest: {}", evicted.description());
            }
        }
    }

    /// Clear all history (project switch, logout).
    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn next_undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|c| c.description())
    }

    pub fn next_redo_description(&self) -> Option<String> {
        self.redo_stack.back().map(|c| c.description())
    }

    /// Undo stack descriptions, oldest first.
    pub fn undo_descriptions(&self) -> Vec<String> {
        self.undo_stack.iter().map(|c| c.description()).collect()
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::SeqCst)
    }

    /// Shared handle to the executing flag.
    pub fn executing_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.executing)
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl Loggable for CommandHistory {
    fn add_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    fn get_logs(&self) -> &[LogEntry] {
        &self.logs
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context_with, snapshot};
    use crate::commands::{CreateTaskParams, UpdateTaskParams};
    use crate::gateway::MockTaskGateway;
    use crate::{NewTask, Task, TaskUpdate};
    use std::sync::atomic::AtomicUsize;

    fn creating_gateway() -> MockTaskGateway {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mock = MockTaskGateway::new();
        mock.expect_create_task().returning(move |_, request| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let id = request.id.clone().unwrap_or_else(|| format!("t{}", n));
            Ok(Task::from_new("p1", request).with_id(id))
        });
        mock.expect_delete_task().returning(|_, _| Ok(()));
        mock
    }

    fn create(title: &str) -> TaskCommand {
        TaskCommand::create(CreateTaskParams::new(title)).unwrap()
    }

    #[tokio::test]
    async fn test_empty_stacks_make_no_gateway_calls() {
        let mut mock = MockTaskGateway::new();
        mock.expect_delete_task().never();
        mock.expect_create_task().never();
        let ctx = context_with(mock, vec![]);
        let mut history = CommandHistory::default();

        let undo = history.undo_last_command(&ctx).await;
        assert!(matches!(undo, Err(TaskflowError::NothingToUndo)));
        assert_eq!(undo.unwrap_err().to_string(), "No commands to undo");

        let redo = history.redo_last_command(&ctx).await;
        assert!(matches!(redo, Err(TaskflowError::NothingToRedo)));
        assert!(!history.is_executing());
    }

    #[tokio::test]
    async fn test_execute_undo_redo_moves_between_stacks() {
        let ctx = context_with(creating_gateway(), vec![]);
        let mut history = CommandHistory::default();

        history.execute_command(&ctx, create("A")).await.unwrap();
        assert_eq!((history.undo_depth(), history.redo_depth()), (1, 0));

        history.undo_last_command(&ctx).await.unwrap();
        assert_eq!((history.undo_depth(), history.redo_depth()), (0, 1));
        assert!(snapshot(&ctx).await.is_empty());

        history.redo_last_command(&ctx).await.unwrap();
        assert_eq!((history.undo_depth(), history.redo_depth()), (1, 0));
        assert_eq!(snapshot(&ctx).await[0].id, "t0");
        assert!(!history.is_executing());
    }

    #[tokio::test]
    async fn test_new_command_clears_redo() {
        let ctx = context_with(creating_gateway(), vec![]);
        let mut history = CommandHistory::default();

        history.execute_command(&ctx, create("A")).await.unwrap();
        history.undo_last_command(&ctx).await.unwrap();
        assert!(history.can_redo());

        history.execute_command(&ctx, create("B")).await.unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.next_undo_description().as_deref(), Some("Create task 'B'"));
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let ctx = context_with(creating_gateway(), vec![]);
        let mut history = CommandHistory::default();

        for i in 0..21 {
            history.execute_command(&ctx, create(&format!("T{}", i))).await.unwrap();
        }

        assert_eq!(history.undo_depth(), 20);
        assert_eq!(history.undo_descriptions()[0], "Create task 'T1'");
    }

    #[tokio::test]
    async fn test_failed_execute_pushes_nothing() {
        let mut mock = MockTaskGateway::new();
        mock.expect_create_task()
            .returning(|_, _| Err(TaskflowError::Gateway("offline".into())));
        let ctx = context_with(mock, vec![]);
        let mut history = CommandHistory::default();

        let result = history.execute_command(&ctx, create("A")).await;

        assert!(matches!(result, Err(TaskflowError::Gateway(_))));
        assert_eq!(history.undo_depth(), 0);
        assert!(!history.is_executing());
        assert_eq!(history.last_log().map(|e| e.activity), Some(Activity::Failed));
    }

    #[tokio::test]
    async fn test_failed_undo_keeps_stacks() {
        let mut mock = MockTaskGateway::new();
        mock.expect_create_task()
            .returning(|_, request: NewTask| Ok(Task::from_new("p1", request).with_id("t0")));
        mock.expect_delete_task()
            .returning(|_, _| Err(TaskflowError::Gateway("500".into())));
        let ctx = context_with(mock, vec![]);
        let mut history = CommandHistory::default();

        history.execute_command(&ctx, create("A")).await.unwrap();
        assert!(history.undo_last_command(&ctx).await.is_err());

        assert_eq!((history.undo_depth(), history.redo_depth()), (1, 0));
        assert_eq!(snapshot(&ctx).await.len(), 1);
    }

    #[tokio::test]
    async fn test_prepare_failure_is_not_recorded() {
        let mut mock = MockTaskGateway::new();
        mock.expect_update_task().never();
        let ctx = context_with(mock, vec![]);
        let mut history = CommandHistory::default();

        let command = TaskCommand::update(UpdateTaskParams::new("ghost", TaskUpdate::title("x"))).unwrap();
        let result = history.execute_command(&ctx, command).await;

        assert!(matches!(result, Err(TaskflowError::NotFound(_))));
        assert!(!history.can_undo());
    }

    #[tokio::test]
    async fn test_activity_log_records_transitions() {
        let ctx = context_with(creating_gateway(), vec![]);
        let mut history = CommandHistory::default();

        history.execute_command(&ctx, create("A")).await.unwrap();
        history.undo_last_command(&ctx).await.unwrap();
        history.redo_last_command(&ctx).await.unwrap();

        let activities: Vec<Activity> = history.get_logs().iter().map(|e| e.activity).collect();
        assert_eq!(activities, [Activity::Executed, Activity::Undone, Activity::Redone]);
    }

    #[test]
    fn test_from_config() {
        let config = TaskflowConfig::default().with_history_capacity(5);
        let history = CommandHistory::from_config(&config);
        assert_eq!(history.capacity(), 5);
        assert!(!history.verify_versions);
    }
}
