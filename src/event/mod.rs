// ABOUTME: Event bus and lifecycle event payloads.
// ABOUTME: Event names are opaque string keys; the constants below are the vocabulary.

mod dispatcher;
#[allow(clippy::module_inception)]
mod event;

pub use dispatcher::EventDispatcher;
pub use event::{Event, Payload};

/// Lifecycle event names used as dispatch keys.
pub mod lifecycle {
    pub const CREATE_RELEASE: &str = "create_release";
    pub const PREPARE_RELEASE: &str = "prepare_release";
    pub const INSTALL_RELEASE: &str = "install_release";
    pub const DEPLOY_RELEASE: &str = "deploy_release";
    pub const CLEANUP_RELEASES: &str = "cleanup_releases";
    pub const SELECT_PREVIOUS_RELEASE: &str = "select_previous_release";
    pub const ROLLBACK_RELEASE: &str = "rollback_release";

    /// Informational sub-event dispatched after a successful command
    /// execution; observer failures never affect the primary outcome.
    pub const COMMAND_EXECUTED: &str = "command_executed";
}
