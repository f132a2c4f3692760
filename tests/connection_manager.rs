// ABOUTME: Tests for the connection manager's registry and per-host caching.
// ABOUTME: Identical instance on repeat lookups, unknown-type failures, last write wins.

mod support;

use parking_lot::Mutex;
use shipwright::connection::{
    ConnectionAdapter, ConnectionError, ConnectionManager, ProcessExecutionResult,
};
use shipwright::deployment::Host;
use std::sync::Arc;
use support::MockConnection;

#[test]
fn repeated_lookup_returns_the_identical_adapter_instance() {
    let mock = Arc::new(MockConnection::new());
    let manager = support::manager_with_mock(Arc::clone(&mock));
    let host = support::mock_host();

    let first = manager.connection_adapter(&host).unwrap();
    let second = manager.connection_adapter(&host).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(host.has_connection());
}

#[test]
fn factory_runs_once_per_host() {
    let constructions = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&constructions);

    let mut manager = ConnectionManager::new();
    manager.register_connection_adapter("mock", move |_host: &Host| {
        *counter.lock() += 1;
        Ok(Arc::new(MockConnection::new()) as Arc<dyn ConnectionAdapter>)
    });

    let host = support::mock_host();
    manager.connection_adapter(&host).unwrap();
    manager.connection_adapter(&host).unwrap();
    manager.connection_adapter(&host).unwrap();

    assert_eq!(*constructions.lock(), 1);
}

#[test]
fn unknown_connection_type_is_a_typed_failure() {
    let manager = ConnectionManager::new();
    let host = Arc::new(Host::new("web-1", "teleport", serde_yaml::Value::Null));

    let error = manager.connection_adapter(&host).err().unwrap();

    match error {
        ConnectionError::UnknownConnectionType(connection_type) => {
            assert_eq!(connection_type, "teleport");
        }
        other => panic!("expected UnknownConnectionType, got {other:?}"),
    }
    // No partial adapter was constructed or cached.
    assert!(!host.has_connection());
}

#[test]
fn registering_a_type_twice_overwrites_the_first_factory() {
    let mut manager = ConnectionManager::new();
    manager.register_connection_adapter("mock", |_host: &Host| {
        Ok(Arc::new(MockConnection::with_exit_code(1)) as Arc<dyn ConnectionAdapter>)
    });
    manager.register_connection_adapter("mock", |_host: &Host| {
        Ok(Arc::new(MockConnection::with_exit_code(7)) as Arc<dyn ConnectionAdapter>)
    });

    let host = support::mock_host();
    let adapter = manager.connection_adapter(&host).unwrap();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let result: ProcessExecutionResult = runtime
        .block_on(adapter.execute_command("true", &[]))
        .unwrap();
    assert_eq!(result.exit_code(), 7);
}

#[test]
fn supports_reports_registered_types() {
    let mock = Arc::new(MockConnection::new());
    let manager = support::manager_with_mock(mock);
    assert!(manager.supports("mock"));
    assert!(!manager.supports("ssh"));
}
