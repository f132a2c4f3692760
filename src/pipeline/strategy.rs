// ABOUTME: Deployment strategies map a requested operation to an event sequence.
// ABOUTME: The default strategy covers full forward deploys and two-stage rollbacks.

use crate::event::lifecycle;

/// Top-level operation requested of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deploy,
    Rollback,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Deploy => f.write_str("deploy"),
            Operation::Rollback => f.write_str("rollback"),
        }
    }
}

/// Policy mapping a requested operation to the ordered lifecycle events to
/// dispatch. Concrete strategies may reorder or add stages without changing
/// the pipeline runner.
///
/// The rollback sequence must be invokable independent of forward progress
/// already made; it may be entered mid-pipeline after a failure.
pub trait DeploymentStrategy: Send + Sync {
    fn events_for_operation(&self, operation: Operation) -> Vec<&'static str>;
}

/// The stock strategy: create, prepare, install, deploy, cleanup; rollback
/// selects the previous release and re-activates it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseDeploymentStrategy;

impl DeploymentStrategy for ReleaseDeploymentStrategy {
    fn events_for_operation(&self, operation: Operation) -> Vec<&'static str> {
        match operation {
            Operation::Deploy => vec![
                lifecycle::CREATE_RELEASE,
                lifecycle::PREPARE_RELEASE,
                lifecycle::INSTALL_RELEASE,
                lifecycle::DEPLOY_RELEASE,
                lifecycle::CLEANUP_RELEASES,
            ],
            Operation::Rollback => vec![
                lifecycle::SELECT_PREVIOUS_RELEASE,
                lifecycle::ROLLBACK_RELEASE,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_sequence_is_ordered_forward() {
        let events = ReleaseDeploymentStrategy.events_for_operation(Operation::Deploy);
        assert_eq!(
            events,
            vec![
                lifecycle::CREATE_RELEASE,
                lifecycle::PREPARE_RELEASE,
                lifecycle::INSTALL_RELEASE,
                lifecycle::DEPLOY_RELEASE,
                lifecycle::CLEANUP_RELEASES,
            ]
        );
    }

    #[test]
    fn rollback_sequence_ends_with_rollback_release() {
        let events = ReleaseDeploymentStrategy.events_for_operation(Operation::Rollback);
        assert_eq!(events.last(), Some(&lifecycle::ROLLBACK_RELEASE));
    }
}
