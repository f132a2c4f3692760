// ABOUTME: One deployable version moving through the lifecycle.
// ABOUTME: Status advances monotonically; only Failed may become RolledBack.

use super::Workspace;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Lifecycle position of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStatus {
    Pending,
    Prepared,
    Installed,
    Deployed,
    Failed,
    RolledBack,
}

impl ReleaseStatus {
    /// Position along the forward lifecycle; failure states have no rank.
    fn rank(self) -> Option<u8> {
        match self {
            ReleaseStatus::Pending => Some(0),
            ReleaseStatus::Prepared => Some(1),
            ReleaseStatus::Installed => Some(2),
            ReleaseStatus::Deployed => Some(3),
            ReleaseStatus::Failed | ReleaseStatus::RolledBack => None,
        }
    }

    /// Whether moving from `self` to `next` is a valid transition.
    pub fn can_transition_to(self, next: ReleaseStatus) -> bool {
        match (self, next) {
            (ReleaseStatus::Failed, ReleaseStatus::RolledBack) => true,
            (ReleaseStatus::Failed | ReleaseStatus::RolledBack, _) => false,
            (_, ReleaseStatus::Failed) => true,
            (_, ReleaseStatus::RolledBack) => false,
            (current, next) => match (current.rank(), next.rank()) {
                (Some(a), Some(b)) => b > a,
                _ => false,
            },
        }
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReleaseStatus::Pending => "pending",
            ReleaseStatus::Prepared => "prepared",
            ReleaseStatus::Installed => "installed",
            ReleaseStatus::Deployed => "deployed",
            ReleaseStatus::Failed => "failed",
            ReleaseStatus::RolledBack => "rolled-back",
        };
        f.write_str(name)
    }
}

/// One version being moved through the deployment lifecycle.
#[derive(Debug)]
pub struct Release {
    version: String,
    source_reference: Option<String>,
    workspace: Arc<Workspace>,
    created_at: DateTime<Utc>,
    status: Mutex<ReleaseStatus>,
}

impl Release {
    pub fn new(workspace: Arc<Workspace>, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            source_reference: None,
            workspace,
            created_at: Utc::now(),
            status: Mutex::new(ReleaseStatus::Pending),
        }
    }

    /// Attaches the commit or tag this release was built from.
    pub fn with_source_reference(mut self, reference: impl Into<String>) -> Self {
        self.source_reference = Some(reference.into());
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn source_reference(&self) -> Option<&str> {
        self.source_reference.as_deref()
    }

    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> ReleaseStatus {
        *self.status.lock()
    }

    /// Directory this release occupies in its workspace.
    pub fn path(&self) -> PathBuf {
        self.workspace.release_path(&self.version)
    }

    /// Moves the status forward. Invalid transitions are ignored so a
    /// release can never move backwards; returns whether the transition
    /// was applied.
    pub fn advance(&self, next: ReleaseStatus) -> bool {
        let mut status = self.status.lock();
        if status.can_transition_to(next) {
            *status = next;
            true
        } else {
            tracing::debug!(
                version = %self.version,
                from = %*status,
                to = %next,
                "ignoring invalid release status transition"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::Host;

    fn release() -> Release {
        let host = Arc::new(Host::new("web-1", "local", serde_yaml::Value::Null));
        let workspace = Arc::new(Workspace::new(host, "/var/www/app"));
        Release::new(workspace, "1.2.0")
    }

    #[test]
    fn new_release_is_pending() {
        assert_eq!(release().status(), ReleaseStatus::Pending);
    }

    #[test]
    fn status_moves_forward_through_lifecycle() {
        let release = release();
        assert!(release.advance(ReleaseStatus::Prepared));
        assert!(release.advance(ReleaseStatus::Installed));
        assert!(release.advance(ReleaseStatus::Deployed));
        assert_eq!(release.status(), ReleaseStatus::Deployed);
    }

    #[test]
    fn status_never_moves_backwards() {
        let release = release();
        assert!(release.advance(ReleaseStatus::Installed));
        assert!(!release.advance(ReleaseStatus::Prepared));
        assert_eq!(release.status(), ReleaseStatus::Installed);
    }

    #[test]
    fn failed_may_only_become_rolled_back() {
        let release = release();
        assert!(release.advance(ReleaseStatus::Failed));
        assert!(!release.advance(ReleaseStatus::Deployed));
        assert!(release.advance(ReleaseStatus::RolledBack));
        assert_eq!(release.status(), ReleaseStatus::RolledBack);
    }

    #[test]
    fn rolled_back_is_terminal() {
        let release = release();
        release.advance(ReleaseStatus::Failed);
        release.advance(ReleaseStatus::RolledBack);
        assert!(!release.advance(ReleaseStatus::Failed));
        assert!(!release.advance(ReleaseStatus::Pending));
    }

    #[test]
    fn rolled_back_requires_failed_first() {
        let release = release();
        assert!(!release.advance(ReleaseStatus::RolledBack));
        assert_eq!(release.status(), ReleaseStatus::Pending);
    }

    #[test]
    fn release_path_lives_under_releases_directory() {
        let release = release();
        assert_eq!(
            release.path(),
            PathBuf::from("/var/www/app/releases/1.2.0")
        );
    }
}
