// ABOUTME: The capability contract every deployment transport implements.
// ABOUTME: Session lifecycle, working-directory cursor, command execution, file operations.

use super::ProcessExecutionResult;
use super::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Transport-specific host operations.
///
/// Tasks perform all host side effects through this trait and never learn
/// which transport is behind it. No operation retries at this layer; retry
/// policy, if any, belongs to the calling task. Implementations with a
/// command timeout must surface it as `ConnectionError::Timeout`, never
/// as a hang.
#[async_trait]
pub trait ConnectionAdapter: Send + Sync {
    /// Establishes the transport session. Idempotent when already connected.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::Connection` or
    /// `ConnectionError::AuthenticationFailed` when the host cannot be
    /// reached or authenticated.
    async fn connect(&self) -> Result<()>;

    /// Tears down the session. A later `connect` may establish a new one.
    async fn disconnect(&self) -> Result<()>;

    /// Pure query: reports whether a session is currently established.
    fn is_connected(&self) -> bool;

    /// Moves the adapter-local working-directory cursor.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::PathNotFound` when the directory does not
    /// exist on the host.
    async fn change_working_directory(&self, path: &Path) -> Result<()>;

    /// Current position of the working-directory cursor.
    fn working_directory(&self) -> PathBuf;

    /// Runs a command relative to the current working directory.
    ///
    /// A non-zero exit code is not an error at this layer; interpretation
    /// of the result is the caller's responsibility.
    async fn execute_command(
        &self,
        command: &str,
        arguments: &[String],
    ) -> Result<ProcessExecutionResult>;

    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Creates the directory and any missing parents.
    async fn create_directory(&self, path: &Path) -> Result<()>;

    /// Names of the entries directly under `path`, sorted.
    async fn list_directory(&self, path: &Path) -> Result<Vec<String>>;

    /// Copies a file or directory tree.
    async fn copy(&self, source: &Path, destination: &Path) -> Result<()>;

    /// Removes a file or directory tree.
    async fn remove(&self, path: &Path) -> Result<()>;

    /// Points `link` at `target`, replacing an existing link.
    async fn create_symlink(&self, target: &Path, link: &Path) -> Result<()>;

    async fn read_file(&self, path: &Path) -> Result<String>;

    async fn write_file(&self, path: &Path, contents: &str) -> Result<()>;
}
