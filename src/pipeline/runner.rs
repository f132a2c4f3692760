// ABOUTME: Drives a deployment strategy's event sequence through the dispatcher.
// ABOUTME: A stage failure switches onto the rollback sequence; state stays inspectable.

use super::error::PipelineError;
use super::strategy::{DeploymentStrategy, Operation};
use crate::deployment::{Release, ReleaseStatus};
use crate::event::{Event, EventDispatcher, lifecycle};
use crate::task::TaskError;
use std::sync::Arc;

/// Observable position of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Preparing,
    Installing,
    Deploying,
    RollingBack,
    Completed,
    Failed,
    RolledBack,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Completed | PipelineState::Failed | PipelineState::RolledBack
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Pending => "pending",
            PipelineState::Preparing => "preparing",
            PipelineState::Installing => "installing",
            PipelineState::Deploying => "deploying",
            PipelineState::RollingBack => "rolling-back",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
            PipelineState::RolledBack => "rolled-back",
        };
        f.write_str(name)
    }
}

/// In-progress state while a given lifecycle event is being dispatched.
fn state_for_event(event_name: &str, operation: Operation) -> PipelineState {
    match event_name {
        lifecycle::CREATE_RELEASE | lifecycle::PREPARE_RELEASE => PipelineState::Preparing,
        lifecycle::INSTALL_RELEASE => PipelineState::Installing,
        lifecycle::DEPLOY_RELEASE | lifecycle::CLEANUP_RELEASES => PipelineState::Deploying,
        lifecycle::SELECT_PREVIOUS_RELEASE | lifecycle::ROLLBACK_RELEASE => {
            PipelineState::RollingBack
        }
        // Custom strategy stages map to the operation's broad phase.
        _ => match operation {
            Operation::Deploy => PipelineState::Deploying,
            Operation::Rollback => PipelineState::RollingBack,
        },
    }
}

/// Release status reached once a lifecycle event completed successfully.
fn status_after_event(event_name: &str) -> Option<ReleaseStatus> {
    match event_name {
        lifecycle::PREPARE_RELEASE => Some(ReleaseStatus::Prepared),
        lifecycle::INSTALL_RELEASE => Some(ReleaseStatus::Installed),
        lifecycle::DEPLOY_RELEASE => Some(ReleaseStatus::Deployed),
        _ => None,
    }
}

/// Sequences lifecycle stages for one release on one host.
///
/// Dispatches each event of the active strategy sequence in order. When a
/// dispatch propagates an error during a deploy, the runner records it,
/// marks the release failed, and continues on the strategy's rollback
/// sequence. A rollback stage failing is terminal; both errors surface and
/// no second-order rollback is attempted.
pub struct PipelineRunner {
    dispatcher: Arc<EventDispatcher>,
    strategy: Box<dyn DeploymentStrategy>,
    state: PipelineState,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("state", &self.state)
            .finish()
    }
}

impl PipelineRunner {
    pub fn new(dispatcher: Arc<EventDispatcher>, strategy: Box<dyn DeploymentStrategy>) -> Self {
        Self {
            dispatcher,
            strategy,
            state: PipelineState::Pending,
        }
    }

    /// Current state; terminal after `run` returns.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Executes the operation for `release`.
    ///
    /// `current_release` is the presently live release, if any; deploy and
    /// rollback events carry it so tasks can diff against what is live.
    ///
    /// # Errors
    ///
    /// Returns a `PipelineError` describing the failed stage. A deploy
    /// failure with a completed rollback still returns an error; the
    /// outcome is distinguishable via `PipelineError::kind` and the
    /// runner's terminal state.
    pub async fn run(
        &mut self,
        operation: Operation,
        release: Arc<Release>,
        current_release: Option<Arc<Release>>,
    ) -> Result<(), PipelineError> {
        self.state = PipelineState::Pending;

        for event_name in self.strategy.events_for_operation(operation) {
            self.state = state_for_event(event_name, operation);
            tracing::info!(stage = event_name, state = %self.state, "dispatching stage");

            let mut event = match operation {
                Operation::Deploy => forward_event(event_name, &release, &current_release),
                Operation::Rollback => rollback_event(&release, &current_release),
            };

            if let Err(error) = self.dispatcher.dispatch(event_name, &mut event).await {
                return match operation {
                    Operation::Deploy => {
                        self.roll_back(event_name, error, &release, &current_release)
                            .await
                    }
                    // A directly requested rollback failing is fatal.
                    Operation::Rollback => {
                        self.state = PipelineState::Failed;
                        release.advance(ReleaseStatus::Failed);
                        Err(PipelineError::StageFailed {
                            event: event_name,
                            source: error,
                        })
                    }
                };
            }

            if let Some(status) = status_after_event(event_name) {
                release.advance(status);
            }
        }

        match operation {
            Operation::Deploy => {
                self.state = PipelineState::Completed;
            }
            Operation::Rollback => {
                self.state = PipelineState::RolledBack;
                release.advance(ReleaseStatus::Failed);
                release.advance(ReleaseStatus::RolledBack);
            }
        }
        Ok(())
    }

    /// Switches onto the rollback sequence after `failed_event` propagated
    /// `error`.
    async fn roll_back(
        &mut self,
        failed_event: &'static str,
        error: TaskError,
        release: &Arc<Release>,
        current_release: &Option<Arc<Release>>,
    ) -> Result<(), PipelineError> {
        tracing::warn!(stage = failed_event, %error, "stage failed; rolling back");
        self.state = PipelineState::Failed;
        release.advance(ReleaseStatus::Failed);

        self.state = PipelineState::RollingBack;
        for event_name in self.strategy.events_for_operation(Operation::Rollback) {
            tracing::info!(stage = event_name, "dispatching rollback stage");
            let mut event = rollback_event(release, current_release);

            if let Err(rollback_error) = self.dispatcher.dispatch(event_name, &mut event).await {
                tracing::error!(stage = event_name, %rollback_error, "rollback stage failed");
                self.state = PipelineState::Failed;
                return Err(PipelineError::RollbackFailed {
                    event: failed_event,
                    source: error,
                    rollback_event: event_name,
                    rollback_source: rollback_error,
                });
            }
        }

        release.advance(ReleaseStatus::RolledBack);
        self.state = PipelineState::RolledBack;
        Err(PipelineError::DeployFailed {
            event: failed_event,
            source: error,
        })
    }
}

/// Payload for a forward (deploy-sequence) event.
fn forward_event(
    event_name: &str,
    release: &Arc<Release>,
    current_release: &Option<Arc<Release>>,
) -> Event {
    match event_name {
        lifecycle::CREATE_RELEASE | lifecycle::PREPARE_RELEASE => Event::for_prepare_release(
            Arc::clone(release.workspace()),
            release.version().to_string(),
        ),
        lifecycle::INSTALL_RELEASE => Event::for_release(Arc::clone(release)),
        _ => Event::for_deploy_release(Arc::clone(release), current_release.clone()),
    }
}

/// Payload for a rollback-sequence event.
///
/// The release to re-activate is the previously live one; the release being
/// rolled back rides along as the "current" reference. With nothing
/// previously live the event only carries the workspace.
fn rollback_event(release: &Arc<Release>, current_release: &Option<Arc<Release>>) -> Event {
    match current_release {
        Some(previous) => {
            Event::for_deploy_release(Arc::clone(previous), Some(Arc::clone(release)))
        }
        None => Event::for_workspace(Arc::clone(release.workspace())),
    }
}
