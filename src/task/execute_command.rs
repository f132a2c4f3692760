// ABOUTME: Reference task: runs a configured command on the release's host.
// ABOUTME: Dispatches a command_executed sub-event on success, fails on non-zero exit.

use super::{Result, Subscription, Task, TaskError, resolve_adapter};
use crate::connection::ConnectionManager;
use crate::event::{Event, EventDispatcher, lifecycle};
use async_trait::async_trait;
use std::sync::Arc;

/// Executes one command with fixed arguments whenever a subscribed
/// lifecycle event fires.
///
/// The working directory is changed to the workspace root before execution
/// and once more afterwards to normalize the cursor, regardless of the
/// command's outcome.
pub struct ExecuteCommandTask {
    connections: Arc<ConnectionManager>,
    events: Vec<String>,
    command: String,
    arguments: Vec<String>,
    priority: i32,
}

impl ExecuteCommandTask {
    pub fn new(
        connections: Arc<ConnectionManager>,
        events: Vec<String>,
        command: impl Into<String>,
        arguments: Vec<String>,
    ) -> Self {
        Self {
            connections,
            events,
            command: command.into(),
            arguments,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

#[async_trait]
impl Task for ExecuteCommandTask {
    fn subscribed_events(&self) -> Vec<Subscription> {
        self.events
            .iter()
            .map(|event| Subscription::new(event, self.priority))
            .collect()
    }

    async fn on_event(
        &self,
        event: &mut Event,
        event_name: &str,
        dispatcher: &EventDispatcher,
    ) -> Result<()> {
        let Some(workspace) = event.workspace().cloned() else {
            tracing::warn!(event = event_name, "event carries no workspace; skipping");
            return Ok(());
        };

        let adapter = resolve_adapter(&self.connections, workspace.host()).await?;

        adapter.change_working_directory(workspace.root()).await?;
        let execution = adapter.execute_command(&self.command, &self.arguments).await;
        // Normalize the cursor even when the command failed.
        adapter.change_working_directory(workspace.root()).await?;

        let result = execution?;
        if !result.is_successful() {
            return Err(TaskError::CommandExecution {
                command: self.command.clone(),
                result,
            });
        }

        tracing::debug!(
            event = event_name,
            command = %self.command,
            "command executed"
        );

        let mut sub_event = Event::for_command_executed(result);
        if let Err(error) = dispatcher
            .dispatch(lifecycle::COMMAND_EXECUTED, &mut sub_event)
            .await
        {
            // Observers of the informational sub-event must never mask the
            // primary operation's outcome.
            tracing::warn!(%error, "command_executed observer failed; ignoring");
        }

        Ok(())
    }
}
