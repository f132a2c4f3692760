// ABOUTME: Configuration types and parsing for shipwright.yml.
// ABOUTME: Hosts, workspace layout, task definitions; discovery and template generation.

mod host;
mod task;

pub use host::HostConfig;
pub use task::TaskConfig;

use crate::error::{Error, Result};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "shipwright.yml";
pub const CONFIG_FILENAME_ALT: &str = "shipwright.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".shipwright/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_hosts")]
    pub hosts: NonEmpty<HostConfig>,

    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Root directory on the host under which releases live.
    pub root: PathBuf,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn template() -> Self {
        Config {
            hosts: NonEmpty::new(HostConfig {
                host: "app.example.com".to_string(),
                connection: "ssh".to_string(),
                port: 22,
                user: Some("deploy".to_string()),
                key_path: None,
                trust_first_connection: true,
            }),
            workspace: WorkspaceConfig {
                root: PathBuf::from("/var/www/app"),
            },
            tasks: vec![
                TaskConfig::CreateWorkspace,
                TaskConfig::SwitchSymlink,
                TaskConfig::CleanupReleases { keep: 5 },
            ],
        }
    }
}

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(&Config::template());
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    let first_host = config.hosts.first();
    format!(
        r#"hosts:
  - host: {}
    connection: {}
    port: {}
    user: {}
workspace:
  root: {}
tasks:
  - type: create-workspace
  - type: switch-symlink
  - type: cleanup-releases
    keep: 5
"#,
        first_host.host,
        first_host.connection,
        first_host.port,
        first_host.user.as_deref().unwrap_or("deploy"),
        config.workspace.root.display()
    )
}

// Custom deserializers

fn deserialize_hosts<'de, D>(deserializer: D) -> std::result::Result<NonEmpty<HostConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<HostEntry> = Vec::deserialize(deserializer)?;
    let hosts = values
        .into_iter()
        .map(|entry| entry.into_host_config())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(serde::de::Error::custom)?;

    NonEmpty::from_vec(hosts)
        .ok_or_else(|| serde::de::Error::custom("at least one host is required"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HostEntry {
    Simple(String),
    Detailed(HostConfig),
}

impl HostEntry {
    fn into_host_config(self) -> std::result::Result<HostConfig, String> {
        match self {
            HostEntry::Simple(s) => HostConfig::parse(&s),
            HostEntry::Detailed(c) => Ok(c),
        }
    }
}
