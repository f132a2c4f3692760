// ABOUTME: Task definitions as they appear in the configuration file.
// ABOUTME: Tagged by `type`; event names are opaque dispatch keys.

use serde::Deserialize;

fn default_keep() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TaskConfig {
    /// Run a command with fixed arguments on the subscribed events.
    Command {
        events: Vec<String>,
        command: String,
        #[serde(default)]
        arguments: Vec<String>,
        #[serde(default)]
        priority: i32,
    },

    /// Ensure the workspace directory skeleton exists.
    CreateWorkspace,

    /// Point the current symlink at the release on deploy and rollback.
    SwitchSymlink,

    /// Remove stale release directories after a deploy.
    CleanupReleases {
        #[serde(default = "default_keep")]
        keep: usize,
    },
}
