//! Task model, local store, and reversible commands for taskflow.
//!
//! The store is the local source of truth for one project's tasks. Every
//! user action is a command that talks to a [`TaskGateway`] first and only
//! mutates the store once the gateway has confirmed. Commands are kept on a
//! bounded [`CommandHistory`] so they can be undone and redone.

pub mod commands;
pub mod conflict;
pub mod field_update;
pub mod gateway;
pub mod history;
pub mod positions;
pub mod selectors;
pub mod session;
pub mod store;
pub mod task;
pub mod task_update;

pub use commands::{
    BulkUpdateParams, Command, CommandContext, CommandKind, CreateTaskParams, DeleteTasksParams,
    MoveTaskParams, PreparedCommand, ReorderTasksParams, SharedStore, TaskCommand,
    UpdateTaskParams,
};
pub use conflict::VersionGuard;
pub use field_update::FieldUpdate;
pub use gateway::{GatewayOp, TaskGateway};
pub use history::{CommandHistory, DEFAULT_HISTORY_CAPACITY};
pub use positions::{column_order, next_position, ColumnKey};
pub use session::ProjectSession;
pub use store::{MutationKind, PriorTask, StoreMutation, TaskPlacement, TaskStore};
pub use task::{
    CustomFieldValue, CustomFields, NewTask, ProjectId, Task, TaskId, TaskPriority, TaskStatus,
};
pub use task_update::{BulkUpdate, TaskUpdate};
