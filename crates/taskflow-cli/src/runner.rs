use crate::script::{resolve, Script, Step};
use serde::Serialize;
use std::sync::Arc;
use taskflow_core::{LogEntry, Loggable, TaskflowConfig, TaskflowResult};
use taskflow_domain::selectors::{board_by_priority, board_by_status, BoardColumn};
use taskflow_domain::{ProjectSession, Task, TaskUpdate};
use taskflow_gateway::{FailureMode, InMemoryGateway};

#[derive(Debug, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub capacity: usize,
    pub undo_depth: usize,
    pub redo_depth: usize,
    /// Oldest first.
    pub undo: Vec<String>,
    pub next_redo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub project: &'a str,
    pub steps: &'a [StepOutcome],
    pub failed_steps: usize,
    pub by_priority: Vec<BoardColumn<'a>>,
    pub by_status: Vec<BoardColumn<'a>>,
    pub history: HistoryView,
    pub activity: &'a [LogEntry],
    pub gateway_calls: usize,
}

/// A session wired to an in-memory server, fed one script step at a time.
pub struct ScriptRunner {
    session: ProjectSession,
    gateway: Arc<InMemoryGateway>,
    outcomes: Vec<StepOutcome>,
    tasks: Vec<Task>,
}

impl ScriptRunner {
    pub async fn start(script: &Script, config: TaskflowConfig) -> anyhow::Result<Self> {
        let gateway = Arc::new(InMemoryGateway::from_config(&config));
        let seed = script.seed.iter().cloned().map(Into::into).collect();
        gateway.seed(&script.project, seed).await;

        let mut session = ProjectSession::new(script.project.clone(), gateway.clone(), config)?;
        let loaded = session.load().await?;
        tracing::info!("Script starts with {} tasks in {}", loaded, script.project);

        Ok(Self {
            session,
            gateway,
            outcomes: Vec::new(),
            tasks: Vec::new(),
        })
    }

    /// Run every step; a failing step is recorded and the script continues.
    pub async fn run(&mut self, steps: &[Step]) {
        for (index, step) in steps.iter().enumerate() {
            let result = self.apply(step).await;
            if let Err(e) = &result {
                tracing::error!("Step {} ({}) failed: {}", index, step.name(), e);
            }
            self.outcomes.push(StepOutcome {
                index,
                op: step.name(),
                ok: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
            });
        }
        self.tasks = self.session.tasks().await;
    }

    async fn apply(&mut self, step: &Step) -> TaskflowResult<()> {
        match step {
            Step::Undo => self.session.undo().await,
            Step::Redo => self.session.redo().await,
            Step::Clear => {
                self.session.clear_history();
                Ok(())
            }
            Step::ExternalEdit {
                task,
                title,
                status,
                priority,
                editor,
            } => {
                let server_tasks = self.gateway.tasks(self.session.project_id()).await;
                let task_id = resolve(&server_tasks, task)?;
                let updates = TaskUpdate {
                    title: title.clone(),
                    status: *status,
                    priority: *priority,
                    ..Default::default()
                };
                self.gateway
                    .simulate_external_edit(self.session.project_id(), &task_id, updates, editor)
                    .await
                    .map(|_| ())
            }
            Step::Fail {
                gateway,
                times,
                message,
            } => {
                let mode = match message {
                    Some(message) => FailureMode::Error(message.clone()),
                    None => FailureMode::Conflict,
                };
                self.gateway.fail_next(*gateway, mode, *times).await;
                Ok(())
            }
            Step::Switch { project } => self.session.switch_project(project.clone()).await.map(|_| ()),
            _ => {
                let tasks = self.session.tasks().await;
                match step.to_command(&tasks)? {
                    Some(command) => self.session.execute(command).await,
                    None => Ok(()),
                }
            }
        }
    }

    pub fn failed_steps(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.ok).count()
    }

    pub async fn report(&self) -> RunReport<'_> {
        let history = self.session.history();
        RunReport {
            project: self.session.project_id(),
            steps: &self.outcomes,
            failed_steps: self.failed_steps(),
            by_priority: board_by_priority(&self.tasks),
            by_status: board_by_status(&self.tasks),
            history: HistoryView {
                capacity: history.capacity(),
                undo_depth: history.undo_depth(),
                redo_depth: history.redo_depth(),
                undo: history.undo_descriptions(),
                next_redo: history.next_redo_description(),
            },
            activity: history.get_logs(),
            gateway_calls: self.gateway.calls().await.len(),
        }
    }
}
