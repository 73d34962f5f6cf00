use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "Run undoable task board scripts against an in-memory server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "FILE", env = "TASKFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Entries kept on each of the undo and redo stacks
    #[arg(long, global = true, env = "TASKFLOW_HISTORY_CAPACITY")]
    pub capacity: Option<usize>,

    /// Check task versions with the server before each undo/redo
    #[arg(long, global = true)]
    pub verify_versions: bool,

    /// Identity stamped as `updatedBy` on server writes
    #[arg(long, global = true, env = "TASKFLOW_ACTOR")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a JSON script and print the resulting board and history
    Run(RunArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct RunArgs {
    /// Script file (JSON)
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Fail with a non-zero exit code if any step fails
    #[arg(long)]
    pub strict: bool,
}
