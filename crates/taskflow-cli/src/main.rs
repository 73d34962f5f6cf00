mod cli;
mod output;
mod runner;
mod script;

use clap::Parser;
use cli::{Cli, Commands};
use runner::ScriptRunner;
use script::Script;
use taskflow_core::TaskflowConfig;

fn effective_config(cli: &Cli) -> anyhow::Result<TaskflowConfig> {
    let mut config = match &cli.config {
        Some(path) => TaskflowConfig::load_from(path)?,
        None => TaskflowConfig::load(),
    };
    if let Some(capacity) = cli.capacity {
        config = config.with_history_capacity(capacity);
    }
    if cli.verify_versions {
        config.verify_versions = true;
    }
    if cli.actor.is_some() {
        config.actor = cli.actor.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(log_path) = std::env::var("TASKFLOW_DEBUG_LOG") {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::WARN)
            .init();
    }

    let cli = Cli::parse();
    let config = match effective_config(&cli) {
        Ok(config) => config,
        Err(e) => output::output_error(&e.to_string()),
    };

    match cli.command {
        Commands::Config => output::output_success(&config)?,
        Commands::Run(args) => {
            let script = match Script::load(&args.script) {
                Ok(script) => script,
                Err(e) => output::output_error(&e.to_string()),
            };
            let mut runner = match ScriptRunner::start(&script, config).await {
                Ok(runner) => runner,
                Err(e) => output::output_error(&e.to_string()),
            };
            runner.run(&script.steps).await;

            if args.strict && runner.failed_steps() > 0 {
                output::output_error(&format!("{} step(s) failed", runner.failed_steps()));
            }
            output::output_success(runner.report().await)?;
        }
    }

    Ok(())
}
