// ABOUTME: Tests for the command-execution reference task.
// ABOUTME: Working-directory discipline, sub-event dispatch, typed failures.

mod support;

use async_trait::async_trait;
use parking_lot::Mutex;
use shipwright::connection::{ConnectionError, ProcessExecutionResult};
use shipwright::event::{Event, EventDispatcher, lifecycle};
use shipwright::task::{ExecuteCommandTask, Subscription, Task, TaskError};
use std::path::PathBuf;
use std::sync::Arc;
use support::{AdapterCall, MockConnection};

/// Counts how often the command_executed sub-event fires.
struct SubEventProbe {
    count: Arc<Mutex<usize>>,
}

#[async_trait]
impl Task for SubEventProbe {
    fn subscribed_events(&self) -> Vec<Subscription> {
        vec![Subscription::new(lifecycle::COMMAND_EXECUTED, 0)]
    }

    async fn on_event(
        &self,
        event: &mut Event,
        _event_name: &str,
        _dispatcher: &EventDispatcher,
    ) -> Result<(), TaskError> {
        assert!(event.execution_result().is_some());
        *self.count.lock() += 1;
        Ok(())
    }
}

/// Sub-event observer that always fails.
struct FailingProbe;

#[async_trait]
impl Task for FailingProbe {
    fn subscribed_events(&self) -> Vec<Subscription> {
        vec![Subscription::new(lifecycle::COMMAND_EXECUTED, 0)]
    }

    async fn on_event(
        &self,
        _event: &mut Event,
        _event_name: &str,
        _dispatcher: &EventDispatcher,
    ) -> Result<(), TaskError> {
        Err(TaskError::NoConnectionAvailable {
            host: "observer".to_string(),
        })
    }
}

struct Fixture {
    mock: Arc<MockConnection>,
    task: ExecuteCommandTask,
    dispatcher: EventDispatcher,
    sub_events: Arc<Mutex<usize>>,
    event: Event,
}

fn fixture(mock: MockConnection) -> Fixture {
    let mock = Arc::new(mock);
    let manager = Arc::new(support::manager_with_mock(Arc::clone(&mock)));

    let host = support::mock_host();
    // Warm the host cache so it reports an available connection.
    manager.connection_adapter(&host).unwrap();

    let workspace = support::workspace_on(host);
    let release = support::release_in(workspace, "1.2.0");

    let task = ExecuteCommandTask::new(
        Arc::clone(&manager),
        vec![lifecycle::INSTALL_RELEASE.to_string()],
        "echo",
        vec!["test".to_string()],
    );

    let sub_events = Arc::new(Mutex::new(0));
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register_task(Arc::new(SubEventProbe {
        count: Arc::clone(&sub_events),
    }));

    Fixture {
        mock,
        task,
        dispatcher,
        sub_events,
        event: Event::for_release(release),
    }
}

#[tokio::test]
async fn successful_command_dispatches_one_sub_event() {
    let mut f = fixture(MockConnection::new());

    f.task
        .on_event(&mut f.event, lifecycle::INSTALL_RELEASE, &f.dispatcher)
        .await
        .unwrap();

    assert_eq!(*f.sub_events.lock(), 1);
    assert_eq!(
        f.mock
            .calls_matching(|c| matches!(c, AdapterCall::ExecuteCommand(cmd, args)
                if cmd == "echo" && args == &["test".to_string()])),
        1
    );
}

#[tokio::test]
async fn working_directory_changes_exactly_twice_on_success() {
    let mut f = fixture(MockConnection::new());

    f.task
        .on_event(&mut f.event, lifecycle::INSTALL_RELEASE, &f.dispatcher)
        .await
        .unwrap();

    let expected = AdapterCall::ChangeWorkingDirectory(PathBuf::from("/var/www/app"));
    assert_eq!(f.mock.calls_matching(|c| *c == expected), 2);
}

#[tokio::test]
async fn working_directory_changes_exactly_twice_on_failure() {
    let mut f = fixture(MockConnection::with_exit_code(1));

    let _ = f
        .task
        .on_event(&mut f.event, lifecycle::INSTALL_RELEASE, &f.dispatcher)
        .await;

    let expected = AdapterCall::ChangeWorkingDirectory(PathBuf::from("/var/www/app"));
    assert_eq!(f.mock.calls_matching(|c| *c == expected), 2);
}

#[tokio::test]
async fn non_zero_exit_fails_with_the_command_in_the_message() {
    let mut f = fixture(MockConnection::with_exit_code(1));

    let error = f
        .task
        .on_event(&mut f.event, lifecycle::INSTALL_RELEASE, &f.dispatcher)
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "Failed executing command \"echo\".");
    assert_eq!(error.exit_code(), Some(1));
    // The success sub-event must not fire.
    assert_eq!(*f.sub_events.lock(), 0);
}

#[tokio::test]
async fn failure_carries_exit_code_and_stderr() {
    let f = fixture(MockConnection::new());
    f.mock
        .script_result(ProcessExecutionResult::new(2, "", "permission denied"));
    let mut event = f.event.clone();

    let error = f
        .task
        .on_event(&mut event, lifecycle::INSTALL_RELEASE, &f.dispatcher)
        .await
        .unwrap_err();

    match &error {
        TaskError::CommandExecution { command, result } => {
            assert_eq!(command, "echo");
            assert_eq!(result.exit_code(), 2);
            assert_eq!(result.stderr(), "permission denied");
        }
        other => panic!("expected CommandExecution, got {other:?}"),
    }
}

#[tokio::test]
async fn sub_event_observer_failure_never_masks_success() {
    let mut f = fixture(MockConnection::new());
    f.dispatcher.register_task(Arc::new(FailingProbe));

    // The probe registered before FailingProbe still counts the sub-event;
    // the observer failure is logged and ignored.
    f.task
        .on_event(&mut f.event, lifecycle::INSTALL_RELEASE, &f.dispatcher)
        .await
        .unwrap();

    assert_eq!(*f.sub_events.lock(), 1);
}

#[tokio::test]
async fn unreachable_host_fails_before_any_command() {
    let mock = Arc::new(MockConnection::unreachable());
    let manager = Arc::new(support::manager_with_mock(Arc::clone(&mock)));
    let workspace = support::workspace_on(support::mock_host());
    let release = support::release_in(workspace, "1.2.0");

    let task = ExecuteCommandTask::new(
        Arc::clone(&manager),
        vec![lifecycle::INSTALL_RELEASE.to_string()],
        "echo",
        vec![],
    );

    let dispatcher = EventDispatcher::new();
    let mut event = Event::for_release(release);
    let error = task
        .on_event(&mut event, lifecycle::INSTALL_RELEASE, &dispatcher)
        .await
        .unwrap_err();

    assert!(matches!(error, TaskError::NoConnectionAvailable { .. }));
    assert_eq!(
        mock.calls_matching(|c| matches!(c, AdapterCall::ExecuteCommand(..))),
        0
    );
}

#[tokio::test]
async fn unknown_connection_type_is_distinguishable_from_command_failure() {
    let manager = Arc::new(shipwright::connection::ConnectionManager::new());
    let host = Arc::new(shipwright::deployment::Host::new(
        "web-1",
        "teleport",
        serde_yaml::Value::Null,
    ));
    let workspace = support::workspace_on(host);
    let release = support::release_in(workspace, "1.2.0");

    let task = ExecuteCommandTask::new(
        manager,
        vec![lifecycle::INSTALL_RELEASE.to_string()],
        "echo",
        vec![],
    );

    let dispatcher = EventDispatcher::new();
    let mut event = Event::for_release(release);
    let error = task
        .on_event(&mut event, lifecycle::INSTALL_RELEASE, &dispatcher)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        TaskError::Connection(ConnectionError::UnknownConnectionType(_))
    ));
    assert!(!matches!(error, TaskError::CommandExecution { .. }));
}

#[test]
fn subscribes_to_each_configured_event() {
    let manager = Arc::new(shipwright::connection::ConnectionManager::new());
    let task = ExecuteCommandTask::new(
        manager,
        vec![
            lifecycle::INSTALL_RELEASE.to_string(),
            lifecycle::DEPLOY_RELEASE.to_string(),
            lifecycle::ROLLBACK_RELEASE.to_string(),
        ],
        "echo",
        vec![],
    )
    .with_priority(5);

    let subscriptions = task.subscribed_events();
    assert_eq!(subscriptions.len(), 3);
    assert!(subscriptions.iter().all(|s| s.priority == 5));
    assert!(
        subscriptions
            .iter()
            .any(|s| s.event == lifecycle::ROLLBACK_RELEASE)
    );
}
