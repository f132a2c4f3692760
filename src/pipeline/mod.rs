// ABOUTME: The deployment pipeline: strategies, the stage runner, and the deploy lock.
// ABOUTME: Exports the state machine types and the unified pipeline error.

mod error;
mod lock;
mod runner;
mod strategy;

pub use error::{PipelineError, PipelineErrorKind};
pub use lock::{DeployLock, LockError, LockInfo};
pub use runner::{PipelineRunner, PipelineState};
pub use strategy::{DeploymentStrategy, Operation, ReleaseDeploymentStrategy};
