// ABOUTME: Shared test support: a recording mock connection adapter.
// ABOUTME: Scripts command results and records every adapter call in order.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use shipwright::connection::{
    ConnectionAdapter, ConnectionError, ConnectionManager, ProcessExecutionResult,
};
use shipwright::deployment::{Host, Release, Workspace};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One recorded adapter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCall {
    Connect,
    Disconnect,
    ChangeWorkingDirectory(PathBuf),
    ExecuteCommand(String, Vec<String>),
    Exists(PathBuf),
    CreateDirectory(PathBuf),
    ListDirectory(PathBuf),
    Copy(PathBuf, PathBuf),
    Remove(PathBuf),
    CreateSymlink(PathBuf, PathBuf),
    ReadFile(PathBuf),
    WriteFile(PathBuf),
}

/// Mock adapter recording calls and replaying scripted command results.
pub struct MockConnection {
    connected: Mutex<bool>,
    fail_connect: bool,
    calls: Mutex<Vec<AdapterCall>>,
    scripted_results: Mutex<VecDeque<ProcessExecutionResult>>,
    default_exit_code: i32,
    directory_entries: Mutex<Vec<String>>,
    working_directory: Mutex<PathBuf>,
}

impl MockConnection {
    /// A connected adapter whose commands exit zero.
    pub fn new() -> Self {
        Self {
            connected: Mutex::new(true),
            fail_connect: false,
            calls: Mutex::new(Vec::new()),
            scripted_results: Mutex::new(VecDeque::new()),
            default_exit_code: 0,
            directory_entries: Mutex::new(Vec::new()),
            working_directory: Mutex::new(PathBuf::from("/")),
        }
    }

    /// A connected adapter whose commands exit with the given code.
    pub fn with_exit_code(exit_code: i32) -> Self {
        Self {
            default_exit_code: exit_code,
            ..Self::new()
        }
    }

    /// A disconnected adapter whose connect attempts fail.
    pub fn unreachable() -> Self {
        Self {
            connected: Mutex::new(false),
            fail_connect: true,
            ..Self::new()
        }
    }

    /// Queue an explicit result for the next command execution.
    pub fn script_result(&self, result: ProcessExecutionResult) {
        self.scripted_results.lock().push_back(result);
    }

    /// Entries returned by `list_directory`.
    pub fn set_directory_entries(&self, entries: Vec<&str>) {
        *self.directory_entries.lock() = entries.into_iter().map(String::from).collect();
    }

    pub fn calls(&self) -> Vec<AdapterCall> {
        self.calls.lock().clone()
    }

    pub fn calls_matching(&self, predicate: impl Fn(&AdapterCall) -> bool) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    fn record(&self, call: AdapterCall) {
        self.calls.lock().push(call);
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionAdapter for MockConnection {
    async fn connect(&self) -> Result<(), ConnectionError> {
        self.record(AdapterCall::Connect);
        if self.fail_connect {
            return Err(ConnectionError::Connection("unreachable".to_string()));
        }
        *self.connected.lock() = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConnectionError> {
        self.record(AdapterCall::Disconnect);
        *self.connected.lock() = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    async fn change_working_directory(&self, path: &Path) -> Result<(), ConnectionError> {
        self.record(AdapterCall::ChangeWorkingDirectory(path.to_path_buf()));
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
    ) -> Result<ProcessExecutionResult, ConnectionError> {
        self.record(AdapterCall::ExecuteCommand(
            command.to_string(),
            arguments.to_vec(),
        ));
        if let Some(result) = self.scripted_results.lock().pop_front() {
            return Ok(result);
        }
        Ok(ProcessExecutionResult::new(self.default_exit_code, "", ""))
    }

    async fn exists(&self, path: &Path) -> Result<bool, ConnectionError> {
        self.record(AdapterCall::Exists(path.to_path_buf()));
        Ok(true)
    }

    async fn create_directory(&self, path: &Path) -> Result<(), ConnectionError> {
        self.record(AdapterCall::CreateDirectory(path.to_path_buf()));
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<String>, ConnectionError> {
        self.record(AdapterCall::ListDirectory(path.to_path_buf()));
        Ok(self.directory_entries.lock().clone())
    }

    async fn copy(&self, source: &Path, destination: &Path) -> Result<(), ConnectionError> {
        self.record(AdapterCall::Copy(
            source.to_path_buf(),
            destination.to_path_buf(),
        ));
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<(), ConnectionError> {
        self.record(AdapterCall::Remove(path.to_path_buf()));
        Ok(())
    }

    async fn create_symlink(&self, target: &Path, link: &Path) -> Result<(), ConnectionError> {
        self.record(AdapterCall::CreateSymlink(
            target.to_path_buf(),
            link.to_path_buf(),
        ));
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<String, ConnectionError> {
        self.record(AdapterCall::ReadFile(path.to_path_buf()));
        Ok(String::new())
    }

    async fn write_file(&self, path: &Path, _contents: &str) -> Result<(), ConnectionError> {
        self.record(AdapterCall::WriteFile(path.to_path_buf()));
        Ok(())
    }
}

/// A manager whose "mock" connection type hands out the given adapter.
pub fn manager_with_mock(mock: Arc<MockConnection>) -> ConnectionManager {
    let mut manager = ConnectionManager::new();
    manager.register_connection_adapter("mock", move |_host: &Host| {
        Ok(Arc::clone(&mock) as Arc<dyn ConnectionAdapter>)
    });
    manager
}

/// Host of connection type "mock" with no settings.
pub fn mock_host() -> Arc<Host> {
    Arc::new(Host::new("web-1", "mock", serde_yaml::Value::Null))
}

pub fn workspace_on(host: Arc<Host>) -> Arc<Workspace> {
    Arc::new(Workspace::new(host, "/var/www/app"))
}

pub fn release_in(workspace: Arc<Workspace>, version: &str) -> Arc<Release> {
    Arc::new(Release::new(workspace, version))
}
