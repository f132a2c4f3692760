// ABOUTME: Units of deployment logic subscribed to lifecycle events.
// ABOUTME: The Task trait plus the concrete tasks shipped with the pipeline.

mod cleanup_releases;
mod create_workspace;
mod error;
mod execute_command;
mod switch_symlink;

pub use cleanup_releases::CleanupReleasesTask;
pub use create_workspace::CreateWorkspaceTask;
pub use error::{Result, TaskError};
pub use execute_command::ExecuteCommandTask;
pub use switch_symlink::SwitchSymlinkTask;

use crate::connection::{ConnectionAdapter, ConnectionManager};
use crate::deployment::Host;
use crate::event::{Event, EventDispatcher};
use async_trait::async_trait;
use std::sync::Arc;

/// One subscription of a task to a lifecycle event.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub event: String,
    pub priority: i32,
}

impl Subscription {
    pub fn new(event: impl Into<String>, priority: i32) -> Self {
        Self {
            event: event.into(),
            priority,
        }
    }
}

/// A unit of deployment logic observing lifecycle stages.
///
/// A task may subscribe the same handler to multiple, unrelated stages
/// (e.g. both an install-time and a rollback-time event).
#[async_trait]
pub trait Task: Send + Sync {
    /// The lifecycle events this task wants to observe, with priorities.
    fn subscribed_events(&self) -> Vec<Subscription>;

    /// Handles one dispatched event. Errors propagate out through the
    /// dispatcher; the pipeline runner interprets them as a stage failure.
    async fn on_event(
        &self,
        event: &mut Event,
        event_name: &str,
        dispatcher: &EventDispatcher,
    ) -> Result<()>;
}

/// Resolves a usable adapter for the host, connecting on first use.
///
/// The host's cached adapter is preferred; a cold host goes through the
/// connection manager (which caches the adapter on the host). An adapter
/// that was torn down is never reconnected implicitly mid-pipeline.
///
/// # Errors
///
/// `ConnectionError::UnknownConnectionType` propagates unchanged; a failed
/// first connection attempt or a torn-down adapter becomes
/// `TaskError::NoConnectionAvailable`.
pub(crate) async fn resolve_adapter(
    connections: &ConnectionManager,
    host: &Host,
) -> Result<Arc<dyn ConnectionAdapter>> {
    if let Some(adapter) = host.connection() {
        if adapter.is_connected() {
            return Ok(adapter);
        }
        return Err(TaskError::NoConnectionAvailable {
            host: host.name().to_string(),
        });
    }

    let adapter = connections.connection_adapter(host)?;
    if let Err(error) = adapter.connect().await {
        tracing::debug!(host = host.name(), %error, "connection attempt failed");
        return Err(TaskError::NoConnectionAvailable {
            host: host.name().to_string(),
        });
    }
    Ok(adapter)
}
