// ABOUTME: Pipeline error with SNAFU pattern.
// ABOUTME: Distinguishes a rolled-back deploy failure from a failed rollback.

use crate::task::TaskError;
use snafu::Snafu;

/// Terminal error of a pipeline run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// A stage of a directly requested rollback failed; no second-order
    /// rollback is attempted.
    #[snafu(display("stage \"{event}\" failed: {source}"))]
    StageFailed {
        event: &'static str,
        source: TaskError,
    },

    /// A deploy stage failed and the rollback sequence completed.
    #[snafu(display("stage \"{event}\" failed (rollback completed): {source}"))]
    DeployFailed {
        event: &'static str,
        source: TaskError,
    },

    /// A deploy stage failed and a rollback stage failed too.
    #[snafu(display(
        "stage \"{event}\" failed: {source}; rollback stage \"{rollback_event}\" also failed: {rollback_source}"
    ))]
    RollbackFailed {
        event: &'static str,
        source: TaskError,
        rollback_event: &'static str,
        rollback_source: TaskError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    StageFailed,
    DeployFailed,
    RollbackFailed,
}

impl PipelineError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> PipelineErrorKind {
        match self {
            PipelineError::StageFailed { .. } => PipelineErrorKind::StageFailed,
            PipelineError::DeployFailed { .. } => PipelineErrorKind::DeployFailed,
            PipelineError::RollbackFailed { .. } => PipelineErrorKind::RollbackFailed,
        }
    }

    /// The error that triggered the failure.
    pub fn stage_error(&self) -> &TaskError {
        match self {
            PipelineError::StageFailed { source, .. }
            | PipelineError::DeployFailed { source, .. }
            | PipelineError::RollbackFailed { source, .. } => source,
        }
    }

    /// The rollback-sequence error, when rollback itself failed.
    pub fn rollback_error(&self) -> Option<&TaskError> {
        match self {
            PipelineError::RollbackFailed {
                rollback_source, ..
            } => Some(rollback_source),
            _ => None,
        }
    }
}
