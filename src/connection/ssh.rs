// ABOUTME: SSH transport built on russh: known-hosts checking, agent/keyfile auth.
// ABOUTME: Commands run through a channel exec loop; file operations via shell utilities.

use super::adapter::ConnectionAdapter;
use super::error::{ConnectionError, Result};
use super::process::ProcessExecutionResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

fn default_port() -> u16 {
    22
}

fn default_trust_on_first_use() -> bool {
    true
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

/// Transport settings carried opaquely on a host's configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SshSettings {
    /// Username for authentication. Defaults to $USER, then "root".
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to a private key file. If absent, the SSH agent is tried,
    /// then the default key locations.
    #[serde(default)]
    pub key_path: Option<PathBuf>,

    /// Whether to accept unknown host keys (Trust On First Use).
    #[serde(default = "default_trust_on_first_use")]
    pub trust_on_first_use: bool,

    /// Path to a known_hosts file; defaults to ~/.ssh/known_hosts.
    #[serde(default)]
    pub known_hosts_path: Option<PathBuf>,

    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            user: None,
            port: default_port(),
            key_path: None,
            trust_on_first_use: default_trust_on_first_use(),
            known_hosts_path: None,
            command_timeout: default_command_timeout(),
        }
    }
}

impl SshSettings {
    fn username(&self) -> String {
        self.user
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()))
    }
}

/// Client handler checking server keys against known_hosts.
struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let check_result = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) => {
                if self.trust_on_first_use {
                    tracing::warn!(
                        "Trust-On-First-Use: accepting unknown host key for {}:{}",
                        self.host,
                        self.port
                    );
                    let learn_result = match &self.known_hosts_path {
                        Some(path) => {
                            learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                        }
                        None => learn_known_hosts(&self.host, self.port, server_public_key),
                    };
                    if let Err(e) = learn_result {
                        tracing::warn!("Failed to save host key to known_hosts: {}", e);
                    }
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Err(russh::keys::Error::KeyChanged { .. }) => Ok(false),
            Err(_) => Ok(self.trust_on_first_use),
        }
    }
}

/// Authentication method resolved from settings.
enum AuthMethod {
    Agent(AgentClient<UnixStream>),
    KeyFile(Arc<ssh_key::PrivateKey>),
}

/// Connection adapter executing commands over an SSH session.
///
/// The working-directory cursor is adapter-local; every command is prefixed
/// with a `cd` into it on the remote side.
pub struct SshConnection {
    address: String,
    settings: SshSettings,
    handle: Mutex<Option<Arc<Handle<SshHandler>>>>,
    working_directory: Mutex<PathBuf>,
}

impl std::fmt::Debug for SshConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConnection")
            .field("address", &self.address)
            .field("port", &self.settings.port)
            .finish()
    }
}

/// Quotes a value for the remote shell.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

impl SshConnection {
    pub fn new(address: impl Into<String>, settings: SshSettings) -> Self {
        Self {
            address: address.into(),
            settings,
            handle: Mutex::new(None),
            working_directory: Mutex::new(PathBuf::from("/")),
        }
    }

    /// Builds an adapter from a host's opaque transport settings.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidSettings` when the settings value
    /// does not deserialize.
    pub fn from_settings(address: &str, settings: &serde_yaml::Value) -> Result<Self> {
        let settings = if settings.is_null() {
            SshSettings::default()
        } else {
            serde_yaml::from_value(settings.clone())
                .map_err(|e| ConnectionError::InvalidSettings(e.to_string()))?
        };
        Ok(Self::new(address, settings))
    }

    /// Resolve which authentication method to use.
    async fn resolve_auth_method(settings: &SshSettings) -> Result<AuthMethod> {
        if let Some(key_path) = &settings.key_path {
            let key = load_secret_key(key_path, None).map_err(|e| {
                ConnectionError::KeyLoadFailed {
                    path: key_path.clone(),
                    reason: e.to_string(),
                }
            })?;
            return Ok(AuthMethod::KeyFile(Arc::new(key)));
        }

        if let Ok(agent) = AgentClient::connect_env().await {
            return Ok(AuthMethod::Agent(agent));
        }

        let home = std::env::var("HOME").map_err(|_| {
            ConnectionError::AgentUnavailable("SSH agent not available and HOME not set".to_string())
        })?;

        let default_keys = [
            format!("{}/.ssh/id_ed25519", home),
            format!("{}/.ssh/id_rsa", home),
            format!("{}/.ssh/id_ecdsa", home),
        ];

        for key_path in &default_keys {
            if let Ok(key) = load_secret_key(key_path, None) {
                return Ok(AuthMethod::KeyFile(Arc::new(key)));
            }
        }

        Err(ConnectionError::AgentUnavailable(
            "SSH agent not available and no default keys found".to_string(),
        ))
    }

    async fn authenticate(
        session: &mut Handle<SshHandler>,
        user: &str,
        auth_method: AuthMethod,
    ) -> Result<bool> {
        match auth_method {
            AuthMethod::Agent(mut agent) => {
                let keys = agent.request_identities().await.map_err(|e| {
                    ConnectionError::AgentUnavailable(format!("failed to list agent keys: {}", e))
                })?;

                if keys.is_empty() {
                    return Err(ConnectionError::AgentUnavailable(
                        "no keys in SSH agent".to_string(),
                    ));
                }

                for key in &keys {
                    match session
                        .authenticate_publickey_with(user, key.clone(), None, &mut agent)
                        .await
                    {
                        Ok(result) if result.success() => return Ok(true),
                        _ => continue,
                    }
                }
                Ok(false)
            }
            AuthMethod::KeyFile(key) => {
                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(ConnectionError::Protocol)?
                    .flatten();

                let result = session
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                    .await
                    .map_err(ConnectionError::Protocol)?;

                Ok(result.success())
            }
        }
    }

    fn current_handle(&self) -> Result<Arc<Handle<SshHandler>>> {
        self.handle
            .lock()
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| ConnectionError::Connection("not connected".to_string()))
    }

    /// Runs a raw shell line on the remote side, bounded by the command timeout.
    async fn run_shell(&self, script: &str) -> Result<ProcessExecutionResult> {
        let handle = self.current_handle()?;
        let timeout = self.settings.command_timeout;
        match tokio::time::timeout(timeout, Self::exec_on(&handle, script)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout(timeout)),
        }
    }

    async fn exec_on(
        handle: &Handle<SshHandler>,
        command: &str,
    ) -> Result<ProcessExecutionResult> {
        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(|e| ConnectionError::CommandFailed(format!("failed to open channel: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| ConnectionError::CommandFailed(format!("failed to exec command: {}", e)))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = 0u32;

        let mut got_exit_status = false;
        let mut got_eof = false;

        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = exit_status;
                    got_exit_status = true;
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelMsg::Eof) => {
                    got_eof = true;
                    if got_exit_status {
                        break;
                    }
                }
                Some(ChannelMsg::Close) => {
                    break;
                }
                Some(_) => {}
                None => break,
            }
        }

        // A channel closing without an exit status indicates abnormal
        // termination (network issue, remote kill).
        if !got_exit_status {
            return Err(ConnectionError::ChannelClosed);
        }

        Ok(ProcessExecutionResult::new(
            exit_code as i32,
            String::from_utf8_lossy(&stdout).to_string(),
            String::from_utf8_lossy(&stderr).to_string(),
        ))
    }

    /// Maps a failed shell utility invocation onto the typed taxonomy.
    fn map_shell_failure(path: &Path, result: &ProcessExecutionResult) -> ConnectionError {
        let stderr = result.stderr().to_lowercase();
        if stderr.contains("no such file") {
            ConnectionError::PathNotFound(path.to_path_buf())
        } else if stderr.contains("permission denied") {
            ConnectionError::Permission(path.to_path_buf())
        } else {
            ConnectionError::CommandFailed(result.stderr().trim().to_string())
        }
    }
}

#[async_trait]
impl ConnectionAdapter for SshConnection {
    async fn connect(&self) -> Result<()> {
        if self.handle.lock().is_some() {
            return Ok(());
        }

        let auth_method = Self::resolve_auth_method(&self.settings).await?;

        let russh_config = Config {
            inactivity_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let handler = SshHandler {
            host: self.address.clone(),
            port: self.settings.port,
            trust_on_first_use: self.settings.trust_on_first_use,
            known_hosts_path: self.settings.known_hosts_path.clone(),
        };

        let mut session = client::connect(
            Arc::new(russh_config),
            (self.address.as_str(), self.settings.port),
            handler,
        )
        .await
        .map_err(|e| {
            if e.to_string().contains("Connection refused") {
                ConnectionError::Connection(format!(
                    "connection refused to {}:{}",
                    self.address, self.settings.port
                ))
            } else {
                ConnectionError::Connection(e.to_string())
            }
        })?;

        let user = self.settings.username();
        let auth_success = Self::authenticate(&mut session, &user, auth_method).await?;
        if !auth_success {
            return Err(ConnectionError::AuthenticationFailed);
        }

        *self.handle.lock() = Some(Arc::new(session));
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
                .map_err(ConnectionError::Protocol)?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.handle.lock().is_some()
    }

    async fn change_working_directory(&self, path: &Path) -> Result<()> {
        let result = self
            .run_shell(&format!("test -d {}", quote_path(path)))
            .await?;
        if !result.is_successful() {
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
        let mut line = format!("cd {} && {}", quote_path(&working_directory), shell_quote(command));
        for argument in arguments {
            line.push(' ');
            line.push_str(&shell_quote(argument));
        }
        self.run_shell(&line).await
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let result = self
            .run_shell(&format!("test -e {}", quote_path(path)))
            .await?;
        Ok(result.is_successful())
    }

    async fn create_directory(&self, path: &Path) -> Result<()> {
        let result = self
            .run_shell(&format!("mkdir -p {}", quote_path(path)))
            .await?;
        if !result.is_successful() {
            return Err(Self::map_shell_failure(path, &result));
        }
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<String>> {
        let result = self
            .run_shell(&format!("ls -1A {}", quote_path(path)))
            .await?;
        if !result.is_successful() {
            return Err(Self::map_shell_failure(path, &result));
        }
        let mut names: Vec<String> = result
            .stdout()
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn copy(&self, source: &Path, destination: &Path) -> Result<()> {
        let result = self
            .run_shell(&format!(
                "cp -a {} {}",
                quote_path(source),
                quote_path(destination)
            ))
            .await?;
        if !result.is_successful() {
            return Err(Self::map_shell_failure(source, &result));
        }
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        let result = self
            .run_shell(&format!("rm -rf {}", quote_path(path)))
            .await?;
        if !result.is_successful() {
            return Err(Self::map_shell_failure(path, &result));
        }
        Ok(())
    }

    async fn create_symlink(&self, target: &Path, link: &Path) -> Result<()> {
        let result = self
            .run_shell(&format!(
                "ln -sfn {} {}",
                quote_path(target),
                quote_path(link)
            ))
            .await?;
        if !result.is_successful() {
            return Err(Self::map_shell_failure(link, &result));
        }
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        let result = self.run_shell(&format!("cat {}", quote_path(path))).await?;
        if !result.is_successful() {
            return Err(Self::map_shell_failure(path, &result));
        }
        Ok(result.stdout().to_string())
    }

    async fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        let result = self
            .run_shell(&format!(
                "printf '%s' {} > {}",
                shell_quote(contents),
                quote_path(path)
            ))
            .await?;
        if !result.is_successful() {
            return Err(Self::map_shell_failure(path, &result));
        }
        Ok(())
    }
}
