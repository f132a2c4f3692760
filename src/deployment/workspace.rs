// ABOUTME: Filesystem layout for deployments on one host.
// ABOUTME: Root path, releases directory, shared data directory, current symlink.

use super::Host;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where releases live on a host.
///
/// All paths are rooted under the workspace root. The workspace never
/// touches the host's connection state itself; tasks request it.
#[derive(Debug)]
pub struct Workspace {
    host: Arc<Host>,
    root: PathBuf,
    releases_directory: PathBuf,
    shared_directory: PathBuf,
    current_symlink: PathBuf,
}

impl Workspace {
    pub fn new(host: Arc<Host>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            releases_directory: root.join("releases"),
            shared_directory: root.join("shared"),
            current_symlink: root.join("current"),
            host,
            root,
        }
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn releases_directory(&self) -> &Path {
        &self.releases_directory
    }

    pub fn shared_directory(&self) -> &Path {
        &self.shared_directory
    }

    /// Path of the symlink pointing at the live release.
    pub fn current_symlink(&self) -> &Path {
        &self.current_symlink
    }

    /// Directory a release with the given version occupies.
    pub fn release_path(&self, version: &str) -> PathBuf {
        self.releases_directory.join(version)
    }
}
