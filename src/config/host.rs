// ABOUTME: Host configuration: connection type plus transport settings.
// ABOUTME: Parses formats like "host", "user@host", "host:port", "user@host:port".

use crate::deployment::Host;
use serde::Deserialize;
use std::path::PathBuf;

fn default_connection_type() -> String {
    "ssh".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_trust_first_connection() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    pub host: String,
    /// Connection-type identifier resolved against the adapter registry.
    #[serde(default = "default_connection_type")]
    pub connection: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,
}

impl HostConfig {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("host address cannot be empty".to_string());
        }

        // Parse format: [user@]host[:port]
        let (user_part, rest) = if let Some(at_pos) = s.find('@') {
            (Some(&s[..at_pos]), &s[at_pos + 1..])
        } else {
            (None, s)
        };

        let (host, port) = if let Some(colon_pos) = rest.rfind(':') {
            let port_str = &rest[colon_pos + 1..];
            let port = port_str
                .parse::<u16>()
                .map_err(|_| format!("invalid port: {}", port_str))?;
            (&rest[..colon_pos], port)
        } else {
            (rest, 22)
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(HostConfig {
            host: host.to_string(),
            connection: default_connection_type(),
            port,
            user: user_part.map(|s| s.to_string()),
            key_path: None,
            trust_first_connection: true,
        })
    }

    /// Opaque transport settings handed to the adapter factory.
    pub fn connection_settings(&self) -> serde_yaml::Value {
        let mut map = serde_yaml::Mapping::new();
        if let Some(user) = &self.user {
            map.insert(
                serde_yaml::Value::from("user"),
                serde_yaml::Value::from(user.clone()),
            );
        }
        map.insert(
            serde_yaml::Value::from("port"),
            serde_yaml::Value::from(u64::from(self.port)),
        );
        if let Some(key_path) = &self.key_path {
            map.insert(
                serde_yaml::Value::from("key_path"),
                serde_yaml::Value::from(key_path.to_string_lossy().into_owned()),
            );
        }
        map.insert(
            serde_yaml::Value::from("trust_on_first_use"),
            serde_yaml::Value::from(self.trust_first_connection),
        );
        serde_yaml::Value::Mapping(map)
    }

    /// Builds the deployment-model host for this entry.
    pub fn to_host(&self) -> Host {
        Host::new(&self.host, &self.connection, self.connection_settings())
    }
}
