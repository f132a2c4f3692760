// ABOUTME: Ensures the workspace directory skeleton exists on the host.
// ABOUTME: Creates root, releases/, shared/, and the release's own directory.

use super::{Result, Subscription, Task, resolve_adapter};
use crate::connection::ConnectionManager;
use crate::event::{Event, EventDispatcher, lifecycle};
use async_trait::async_trait;
use std::sync::Arc;

/// Priority above command tasks so the skeleton exists before any command
/// runs in the same stage.
const PRIORITY: i32 = 100;

pub struct CreateWorkspaceTask {
    connections: Arc<ConnectionManager>,
}

impl CreateWorkspaceTask {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl Task for CreateWorkspaceTask {
    fn subscribed_events(&self) -> Vec<Subscription> {
        vec![Subscription::new(lifecycle::CREATE_RELEASE, PRIORITY)]
    }

    async fn on_event(
        &self,
        event: &mut Event,
        event_name: &str,
        _dispatcher: &EventDispatcher,
    ) -> Result<()> {
        let Some(workspace) = event.workspace().cloned() else {
            tracing::warn!(event = event_name, "event carries no workspace; skipping");
            return Ok(());
        };

        let adapter = resolve_adapter(&self.connections, workspace.host()).await?;

        adapter.create_directory(workspace.root()).await?;
        adapter
            .create_directory(workspace.releases_directory())
            .await?;
        adapter
            .create_directory(workspace.shared_directory())
            .await?;

        if let Some(version) = event.version() {
            adapter
                .create_directory(&workspace.release_path(version))
                .await?;
        }

        tracing::info!(
            host = workspace.host().name(),
            root = %workspace.root().display(),
            "workspace ready"
        );
        Ok(())
    }
}
