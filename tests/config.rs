// ABOUTME: Integration tests for configuration parsing and validation.
// ABOUTME: YAML parsing, host entry forms, task definitions, discovery.

use shipwright::config::{Config, TaskConfig, init_config};
use std::fs;

#[test]
fn parses_full_configuration() {
    let yaml = r#"
hosts:
  - host: app.example.com
    connection: ssh
    port: 2222
    user: deploy
workspace:
  root: /var/www/app
tasks:
  - type: create-workspace
  - type: command
    events: [install_release]
    command: composer
    arguments: [install, --no-dev]
    priority: 10
  - type: switch-symlink
  - type: cleanup-releases
    keep: 3
"#;

    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.hosts.len(), 1);
    let host = config.hosts.first();
    assert_eq!(host.host, "app.example.com");
    assert_eq!(host.port, 2222);
    assert_eq!(host.user.as_deref(), Some("deploy"));
    assert_eq!(config.workspace.root.to_str(), Some("/var/www/app"));
    assert_eq!(config.tasks.len(), 4);

    match &config.tasks[1] {
        TaskConfig::Command {
            events,
            command,
            arguments,
            priority,
        } => {
            assert_eq!(events, &vec!["install_release".to_string()]);
            assert_eq!(command, "composer");
            assert_eq!(arguments.len(), 2);
            assert_eq!(*priority, 10);
        }
        other => panic!("expected command task, got {other:?}"),
    }
}

#[test]
fn parses_shorthand_host_entries() {
    let yaml = r#"
hosts:
  - deploy@app.example.com:2222
  - app2.example.com
workspace:
  root: /var/www/app
"#;

    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.hosts.len(), 2);
    assert_eq!(config.hosts.first().user.as_deref(), Some("deploy"));
    assert_eq!(config.hosts.first().port, 2222);
    assert_eq!(config.hosts.last().host, "app2.example.com");
    assert_eq!(config.hosts.last().port, 22);
}

#[test]
fn rejects_empty_host_list() {
    let yaml = r#"
hosts: []
workspace:
  root: /var/www/app
"#;
    assert!(Config::from_yaml(yaml).is_err());
}

#[test]
fn rejects_missing_workspace() {
    let yaml = r#"
hosts:
  - app.example.com
"#;
    assert!(Config::from_yaml(yaml).is_err());
}

#[test]
fn tasks_default_to_empty() {
    let yaml = r#"
hosts:
  - app.example.com
workspace:
  root: /srv/app
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert!(config.tasks.is_empty());
}

#[test]
fn discovers_config_in_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("shipwright.yml"),
        "hosts: [app.example.com]\nworkspace:\n  root: /srv/app\n",
    )
    .unwrap();

    let config = Config::discover(dir.path()).unwrap();
    assert_eq!(config.hosts.first().host, "app.example.com");
}

#[test]
fn discover_fails_without_config() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::discover(dir.path()).is_err());
}

#[test]
fn init_writes_a_parseable_template() {
    let dir = tempfile::tempdir().unwrap();
    init_config(dir.path(), false).unwrap();

    let config = Config::discover(dir.path()).unwrap();
    assert_eq!(config.hosts.first().host, "app.example.com");
    assert_eq!(config.tasks.len(), 3);
}

#[test]
fn init_refuses_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    init_config(dir.path(), false).unwrap();
    assert!(init_config(dir.path(), false).is_err());
    assert!(init_config(dir.path(), true).is_ok());
}

#[test]
fn template_is_internally_consistent() {
    let config = Config::template();
    assert!(!config.tasks.is_empty());
    assert_eq!(config.hosts.first().connection, "ssh");
}
