// ABOUTME: Errors raised by tasks during a lifecycle stage.
// ABOUTME: Never swallowed in the dispatch chain; the pipeline runner interprets them.

use crate::connection::{ConnectionError, ProcessExecutionResult};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    /// The executed command returned a non-zero exit code.
    #[error("Failed executing command \"{command}\".")]
    CommandExecution {
        command: String,
        result: ProcessExecutionResult,
    },

    /// The task was invoked against a host with no usable adapter.
    #[error("no connection available for host \"{host}\"")]
    NoConnectionAvailable { host: String },

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl TaskError {
    /// Exit code of the failed command, when this is a command failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            TaskError::CommandExecution { result, .. } => Some(result.exit_code()),
            _ => None,
        }
    }

    /// Captured stderr of the failed command, when this is a command failure.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            TaskError::CommandExecution { result, .. } => Some(result.stderr()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
