// ABOUTME: Local filesystem transport: commands as child processes, files via tokio::fs.
// ABOUTME: Maps io::ErrorKind onto the typed connection error taxonomy.

use super::adapter::ConnectionAdapter;
use super::error::{ConnectionError, Result};
use super::process::ProcessExecutionResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalSettings {
    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            command_timeout: default_command_timeout(),
        }
    }
}

/// Connection adapter for the machine the pipeline runs on.
#[derive(Debug)]
pub struct LocalConnection {
    command_timeout: Duration,
    connected: Mutex<bool>,
    working_directory: Mutex<PathBuf>,
}

impl Default for LocalConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalConnection {
    pub fn new() -> Self {
        Self::with_settings(LocalSettings::default())
    }

    pub fn with_settings(settings: LocalSettings) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        Self {
            command_timeout: settings.command_timeout,
            connected: Mutex::new(false),
            working_directory: Mutex::new(cwd),
        }
    }

    /// Builds an adapter from a host's opaque transport settings.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidSettings` when the settings value
    /// does not deserialize.
    pub fn from_settings(settings: &serde_yaml::Value) -> Result<Self> {
        let settings = if settings.is_null() {
            LocalSettings::default()
        } else {
            serde_yaml::from_value(settings.clone())
                .map_err(|e| ConnectionError::InvalidSettings(e.to_string()))?
        };
        Ok(Self::with_settings(settings))
    }
}

/// Maps an I/O error for `path` onto the typed taxonomy.
fn map_io_error(path: &Path, error: std::io::Error) -> ConnectionError {
    match error.kind() {
        std::io::ErrorKind::NotFound => ConnectionError::PathNotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => ConnectionError::Permission(path.to_path_buf()),
        _ => ConnectionError::Io(error),
    }
}

fn copy_tree(source: &Path, destination: &Path) -> std::io::Result<()> {
    let metadata = std::fs::symlink_metadata(source)?;
    if metadata.is_dir() {
        std::fs::create_dir_all(destination)?;
        for entry in std::fs::read_dir(source)? {
            let entry = entry?;
            copy_tree(&entry.path(), &destination.join(entry.file_name()))?;
        }
    } else if metadata.is_symlink() {
        let target = std::fs::read_link(source)?;
        let _ = std::fs::remove_file(destination);
        std::os::unix::fs::symlink(target, destination)?;
    } else {
        std::fs::copy(source, destination)?;
    }
    Ok(())
}

#[async_trait]
impl ConnectionAdapter for LocalConnection {
    async fn connect(&self) -> Result<()> {
        *self.connected.lock() = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        *self.connected.lock() = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    async fn change_working_directory(&self, path: &Path) -> Result<()> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| map_io_error(path, e))?;
        if !metadata.is_dir() {
            return Err(ConnectionError::PathNotFound(path.to_path_buf()));
        }
        *self.working_directory.lock() = path.to_path_buf();
        Ok(())
    }

    fn working_directory(&self) -> PathBuf {
        self.working_directory.lock().clone()
    }

    async fn execute_command(
        &self,
        command: &str,
        arguments: &[String],
    ) -> Result<ProcessExecutionResult> {
        let working_directory = self.working_directory.lock().clone();
        let output = Command::new(command)
            .args(arguments)
            .current_dir(&working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let output = match tokio::time::timeout(self.command_timeout, output).await {
            Err(_) => return Err(ConnectionError::Timeout(self.command_timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                // Missing binary: report the shell's conventional exit code
                // instead of a transport error, matching remote execution.
                return Ok(ProcessExecutionResult::new(127, "", e.to_string()));
            }
            Ok(Err(e)) => return Err(ConnectionError::Io(e)),
            Ok(Ok(output)) => output,
        };

        // Signal-terminated processes have no exit status.
        let exit_code = output.status.code().unwrap_or(-1);
        Ok(ProcessExecutionResult::new(
            exit_code,
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        ))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        match tokio::fs::symlink_metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_io_error(path, e)),
        }
    }

    async fn create_directory(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| map_io_error(path, e))
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| map_io_error(path, e))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| map_io_error(path, e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn copy(&self, source: &Path, destination: &Path) -> Result<()> {
        let source = source.to_path_buf();
        let destination = destination.to_path_buf();
        let result = tokio::task::spawn_blocking(move || {
            copy_tree(&source, &destination).map_err(|e| map_io_error(&source, e))
        })
        .await
        .map_err(|e| ConnectionError::Io(std::io::Error::other(e)))?;
        result
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        let metadata = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|e| map_io_error(path, e))?;
        if metadata.is_dir() {
            tokio::fs::remove_dir_all(path)
                .await
                .map_err(|e| map_io_error(path, e))
        } else {
            tokio::fs::remove_file(path)
                .await
                .map_err(|e| map_io_error(path, e))
        }
    }

    async fn create_symlink(&self, target: &Path, link: &Path) -> Result<()> {
        match tokio::fs::symlink_metadata(link).await {
            Ok(_) => tokio::fs::remove_file(link)
                .await
                .map_err(|e| map_io_error(link, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(map_io_error(link, e)),
        }
        tokio::fs::symlink(target, link)
            .await
            .map_err(|e| map_io_error(link, e))
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| map_io_error(path, e))
    }

    async fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| map_io_error(path, e))
    }
}
