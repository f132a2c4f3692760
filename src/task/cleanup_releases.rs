// ABOUTME: Removes stale release directories after a successful deploy.
// ABOUTME: Keeps the deployed release, the previously live one, and the newest N.

use super::{Result, Subscription, Task, resolve_adapter};
use crate::connection::ConnectionManager;
use crate::event::{Event, EventDispatcher, lifecycle};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

pub struct CleanupReleasesTask {
    connections: Arc<ConnectionManager>,
    keep: usize,
}

impl CleanupReleasesTask {
    pub fn new(connections: Arc<ConnectionManager>, keep: usize) -> Self {
        Self { connections, keep }
    }
}

#[async_trait]
impl Task for CleanupReleasesTask {
    fn subscribed_events(&self) -> Vec<Subscription> {
        vec![Subscription::new(lifecycle::CLEANUP_RELEASES, 0)]
    }

    async fn on_event(
        &self,
        event: &mut Event,
        event_name: &str,
        _dispatcher: &EventDispatcher,
    ) -> Result<()> {
        let Some(release) = event.release().cloned() else {
            tracing::debug!(event = event_name, "no release on event; skipping");
            return Ok(());
        };

        let workspace = release.workspace();
        let adapter = resolve_adapter(&self.connections, workspace.host()).await?;

        if !adapter.exists(workspace.releases_directory()).await? {
            return Ok(());
        }

        let mut retained: HashSet<String> = HashSet::new();
        retained.insert(release.version().to_string());
        if let Some(current) = event.current_release() {
            retained.insert(current.version().to_string());
        }

        let mut entries = adapter.list_directory(workspace.releases_directory()).await?;
        // Newest versions sort last; keep the tail.
        entries.sort();
        let cutoff = entries.len().saturating_sub(self.keep);

        for (index, entry) in entries.iter().enumerate() {
            if index >= cutoff || retained.contains(entry) {
                continue;
            }
            let path = workspace.releases_directory().join(entry);
            tracing::info!(release = %entry, "removing stale release");
            adapter.remove(&path).await?;
        }

        Ok(())
    }
}
