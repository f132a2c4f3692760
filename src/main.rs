// ABOUTME: Entry point for the shipwright CLI application.
// ABOUTME: The composition root: wires adapters and tasks explicitly, then runs the pipeline.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use shipwright::config::{self, Config, HostConfig, TaskConfig};
use shipwright::connection::{
    ConnectionAdapter, ConnectionManager, LocalConnection, SshConnection,
};
use shipwright::deployment::{Host, Release, Workspace};
use shipwright::error::{Error, Result};
use shipwright::event::EventDispatcher;
use shipwright::output::{Output, OutputMode};
use shipwright::pipeline::{DeployLock, Operation, PipelineRunner, ReleaseDeploymentStrategy};
use shipwright::task::{
    CleanupReleasesTask, CreateWorkspaceTask, ExecuteCommandTask, SwitchSymlinkTask, Task,
};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);

    if let Err(e) = run(cli, &mut output).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    match cli.command {
        Commands::Init { force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, force)
        }
        Commands::Deploy {
            version,
            reference,
            current,
            force,
        } => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            deploy(&config, &version, reference.as_deref(), current.as_deref(), force, output)
                .await
        }
        Commands::Rollback {
            version,
            previous,
            force,
        } => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            rollback(&config, &version, previous.as_deref(), force, output).await
        }
        Commands::Status => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            output.progress(&format!("Workspace: {}", config.workspace.root.display()));
            output.progress(&format!("Hosts: {}", config.hosts.len()));
            for host in &config.hosts {
                output.progress(&format!(
                    "  {} ({}:{})",
                    host.host, host.connection, host.port
                ));
            }
            output.progress(&format!("Tasks: {}", config.tasks.len()));
            Ok(())
        }
    }
}

/// Deploy the release to all configured hosts, sequentially.
async fn deploy(
    config: &Config,
    version: &str,
    reference: Option<&str>,
    current: Option<&str>,
    force: bool,
    output: &mut Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!(
        "Deploying {} to {} host(s)",
        version,
        config.hosts.len()
    ));

    for host_config in &config.hosts {
        output.stage(&format!("Deploying to {}", host_config.host));
        run_on_host(
            config,
            host_config,
            Operation::Deploy,
            version,
            reference,
            current,
            force,
            output,
        )
        .await?;
    }

    output.success("Deployment complete");
    Ok(())
}

/// Roll back all configured hosts to the previous release, sequentially.
async fn rollback(
    config: &Config,
    version: &str,
    previous: Option<&str>,
    force: bool,
    output: &mut Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!(
        "Rolling back {} on {} host(s)",
        version,
        config.hosts.len()
    ));

    for host_config in &config.hosts {
        output.stage(&format!("Rolling back {}", host_config.host));
        run_on_host(
            config,
            host_config,
            Operation::Rollback,
            version,
            None,
            previous,
            force,
            output,
        )
        .await?;
    }

    output.success("Rollback complete");
    Ok(())
}

/// Run one pipeline operation against a single host.
#[allow(clippy::too_many_arguments)]
async fn run_on_host(
    config: &Config,
    host_config: &HostConfig,
    operation: Operation,
    version: &str,
    reference: Option<&str>,
    counterpart: Option<&str>,
    force: bool,
    output: &mut Output,
) -> Result<()> {
    let host = Arc::new(host_config.to_host());
    let workspace = Arc::new(Workspace::new(
        Arc::clone(&host),
        config.workspace.root.clone(),
    ));

    let mut release = Release::new(Arc::clone(&workspace), version);
    if let Some(reference) = reference {
        release = release.with_source_reference(reference);
    }
    let release = Arc::new(release);
    let counterpart =
        counterpart.map(|v| Arc::new(Release::new(Arc::clone(&workspace), v)));

    let connections = Arc::new(default_connection_manager());
    let dispatcher = Arc::new(build_dispatcher(&config.tasks, Arc::clone(&connections)));

    output.stage("Connecting");
    let adapter = connections.connection_adapter(&host)?;
    adapter.connect().await?;

    output.stage("Acquiring deploy lock");
    let lock = DeployLock::acquire(Arc::clone(&adapter), &workspace, force).await?;

    let mut runner = PipelineRunner::new(dispatcher, Box::new(ReleaseDeploymentStrategy));
    let outcome = runner.run(operation, Arc::clone(&release), counterpart).await;

    lock.release().await?;
    if let Some(adapter) = host.take_connection() {
        adapter.disconnect().await?;
    }

    match outcome {
        Ok(()) => {
            output.stage(&format!(
                "{} finished in state {} (release {})",
                operation,
                runner.state(),
                release.status()
            ));
            Ok(())
        }
        Err(e) => {
            tracing::error!(state = %runner.state(), "pipeline failed");
            Err(Error::from(e))
        }
    }
}

/// Adapter factories for the built-in connection types, registered once
/// before any dispatch.
fn default_connection_manager() -> ConnectionManager {
    let mut manager = ConnectionManager::new();
    manager.register_connection_adapter("local", |host: &Host| {
        Ok(Arc::new(LocalConnection::from_settings(host.settings())?) as Arc<dyn ConnectionAdapter>)
    });
    manager.register_connection_adapter("ssh", |host: &Host| {
        Ok(Arc::new(SshConnection::from_settings(host.name(), host.settings())?)
            as Arc<dyn ConnectionAdapter>)
    });
    manager
}

/// Builds the dispatcher from the configured task list.
fn build_dispatcher(tasks: &[TaskConfig], connections: Arc<ConnectionManager>) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    for task_config in tasks {
        let task: Arc<dyn Task> = match task_config {
            TaskConfig::Command {
                events,
                command,
                arguments,
                priority,
            } => Arc::new(
                ExecuteCommandTask::new(
                    Arc::clone(&connections),
                    events.clone(),
                    command.clone(),
                    arguments.clone(),
                )
                .with_priority(*priority),
            ),
            TaskConfig::CreateWorkspace => {
                Arc::new(CreateWorkspaceTask::new(Arc::clone(&connections)))
            }
            TaskConfig::SwitchSymlink => {
                Arc::new(SwitchSymlinkTask::new(Arc::clone(&connections)))
            }
            TaskConfig::CleanupReleases { keep } => {
                Arc::new(CleanupReleasesTask::new(Arc::clone(&connections), *keep))
            }
        };
        dispatcher.register_task(task);
    }
    dispatcher
}
