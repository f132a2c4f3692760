// ABOUTME: The deployment data model: hosts, workspaces, releases.
// ABOUTME: A Release belongs to one Workspace, which belongs to one Host.

mod host;
mod release;
mod workspace;

pub use host::Host;
pub use release::{Release, ReleaseStatus};
pub use workspace::Workspace;
