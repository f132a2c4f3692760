// ABOUTME: Lifecycle event payloads dispatched through the event bus.
// ABOUTME: A closed set of tagged variants sharing release/workspace accessors.

use crate::connection::ProcessExecutionResult;
use crate::deployment::{Release, Workspace};
use std::sync::Arc;

/// Stage-specific payload carried by a dispatched event.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Pre-release stages that only concern the workspace.
    Workspace { workspace: Arc<Workspace> },

    /// Preparation of a release that does not exist on the host yet.
    PrepareRelease {
        workspace: Arc<Workspace>,
        version: String,
    },

    /// Stages operating on one release.
    Release { release: Arc<Release> },

    /// Deploy-oriented stages; `current_release` is what is presently live,
    /// letting tasks diff against it (symlink swap, stale cleanup).
    DeployRelease {
        release: Arc<Release>,
        current_release: Option<Arc<Release>>,
    },

    /// Informational sub-event after a successful command execution.
    CommandExecuted { result: ProcessExecutionResult },
}

/// One dispatched occurrence of a lifecycle event.
///
/// Listeners receive the event mutably so they can stop propagation;
/// stopping halts further listeners for the current dispatch only and does
/// not abort the surrounding pipeline.
#[derive(Debug, Clone)]
pub struct Event {
    payload: Payload,
    propagation_stopped: bool,
}

impl Event {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            propagation_stopped: false,
        }
    }

    pub fn for_workspace(workspace: Arc<Workspace>) -> Self {
        Self::new(Payload::Workspace { workspace })
    }

    pub fn for_prepare_release(workspace: Arc<Workspace>, version: impl Into<String>) -> Self {
        Self::new(Payload::PrepareRelease {
            workspace,
            version: version.into(),
        })
    }

    pub fn for_release(release: Arc<Release>) -> Self {
        Self::new(Payload::Release { release })
    }

    pub fn for_deploy_release(
        release: Arc<Release>,
        current_release: Option<Arc<Release>>,
    ) -> Self {
        Self::new(Payload::DeployRelease {
            release,
            current_release,
        })
    }

    pub fn for_command_executed(result: ProcessExecutionResult) -> Self {
        Self::new(Payload::CommandExecuted { result })
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The release this event is about, when it carries one.
    pub fn release(&self) -> Option<&Arc<Release>> {
        match &self.payload {
            Payload::Release { release } | Payload::DeployRelease { release, .. } => Some(release),
            _ => None,
        }
    }

    /// The workspace this event concerns, directly or through its release.
    pub fn workspace(&self) -> Option<&Arc<Workspace>> {
        match &self.payload {
            Payload::Workspace { workspace } | Payload::PrepareRelease { workspace, .. } => {
                Some(workspace)
            }
            Payload::Release { release } | Payload::DeployRelease { release, .. } => {
                Some(release.workspace())
            }
            Payload::CommandExecuted { .. } => None,
        }
    }

    /// The presently live release, on deploy-oriented events.
    pub fn current_release(&self) -> Option<&Arc<Release>> {
        match &self.payload {
            Payload::DeployRelease {
                current_release, ..
            } => current_release.as_ref(),
            _ => None,
        }
    }

    /// The version label this event targets.
    pub fn version(&self) -> Option<&str> {
        match &self.payload {
            Payload::PrepareRelease { version, .. } => Some(version),
            Payload::Release { release } | Payload::DeployRelease { release, .. } => {
                Some(release.version())
            }
            _ => None,
        }
    }

    pub fn execution_result(&self) -> Option<&ProcessExecutionResult> {
        match &self.payload {
            Payload::CommandExecuted { result } => Some(result),
            _ => None,
        }
    }

    /// Halts invocation of the remaining listeners for the current dispatch.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}
