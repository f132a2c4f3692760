// ABOUTME: Activates a release by pointing the workspace's current symlink at it.
// ABOUTME: One handler serves both the deploy and the rollback stage.

use super::{Result, Subscription, Task, resolve_adapter};
use crate::connection::ConnectionManager;
use crate::event::{Event, EventDispatcher, lifecycle};
use async_trait::async_trait;
use std::sync::Arc;

pub struct SwitchSymlinkTask {
    connections: Arc<ConnectionManager>,
}

impl SwitchSymlinkTask {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl Task for SwitchSymlinkTask {
    fn subscribed_events(&self) -> Vec<Subscription> {
        vec![
            Subscription::new(lifecycle::DEPLOY_RELEASE, 0),
            Subscription::new(lifecycle::ROLLBACK_RELEASE, 0),
        ]
    }

    async fn on_event(
        &self,
        event: &mut Event,
        event_name: &str,
        _dispatcher: &EventDispatcher,
    ) -> Result<()> {
        // On rollback with no previously live release there is nothing to
        // re-activate; the runner dispatches a workspace-only payload then.
        let Some(release) = event.release().cloned() else {
            tracing::debug!(event = event_name, "no release to activate; skipping");
            return Ok(());
        };

        let workspace = release.workspace();
        let adapter = resolve_adapter(&self.connections, workspace.host()).await?;

        adapter
            .create_symlink(&release.path(), workspace.current_symlink())
            .await?;

        tracing::info!(
            event = event_name,
            version = release.version(),
            "current symlink switched"
        );
        Ok(())
    }
}
