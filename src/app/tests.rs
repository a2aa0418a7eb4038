use super::*;
use crate::config::{
    BootgateConfig, DependencyConfig, FailurePolicy, LaunchMode, PrepareStep, ServerConfig,
    ShutdownConfig,
};
use crate::error::BootgateError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

fn test_config(port: u16, prepare: Vec<PrepareStep>, server_command: &[&str]) -> BootgateConfig {
    BootgateConfig {
        dependency: DependencyConfig {
            host: "127.0.0.1".to_string(),
            port,
            poll_interval_secs: 1,
            connect_timeout_secs: 1,
            max_attempts: Some(5),
        },
        prepare,
        server: ServerConfig {
            command: server_command.iter().map(|s| s.to_string()).collect(),
            mode: LaunchMode::Production,
            dev_args: vec![],
            prod_args: vec![],
            env: HashMap::new(),
        },
        shutdown: ShutdownConfig {
            grace_period_secs: 5,
        },
    }
}

fn step(name: &str, command: &[&str], on_failure: FailurePolicy) -> PrepareStep {
    PrepareStep {
        name: name.to_string(),
        command: command.iter().map(|s| s.to_string()).collect(),
        on_failure,
    }
}

async fn local_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

#[tokio::test]
async fn test_full_startup_sequence() {
    let (_listener, port) = local_listener().await;
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("migrated");

    let config = test_config(
        port,
        vec![step(
            "migrate",
            &["touch", marker.to_str().unwrap()],
            FailurePolicy::Abort,
        )],
        &["sh", "-c", "exit 0"],
    );

    let mut supervisor = Supervisor::new(config);
    let exit_code = supervisor.run().await.unwrap();

    assert_eq!(exit_code, 0);
    assert!(marker.exists());
    assert_eq!(supervisor.state().await, SupervisorState::ShuttingDown);
}

#[tokio::test]
async fn test_child_exit_code_propagates_without_signal() {
    let (_listener, port) = local_listener().await;

    let config = test_config(port, vec![], &["sh", "-c", "exit 5"]);
    let mut supervisor = Supervisor::new(config);

    let exit_code = supervisor.run().await.unwrap();
    assert_eq!(exit_code, 5);
}

#[tokio::test]
async fn test_fatal_preparation_blocks_launch() {
    let (_listener, port) = local_listener().await;
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("server-started");

    let config = test_config(
        port,
        vec![step("migrate", &["sh", "-c", "exit 2"], FailurePolicy::Abort)],
        &["touch", marker.to_str().unwrap()],
    );

    let mut supervisor = Supervisor::new(config);
    let err = supervisor.run().await.unwrap_err();

    match err {
        BootgateError::Prepare { step, code } => {
            assert_eq!(step, "migrate");
            assert_eq!(code, Some(2));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!marker.exists(), "server must not launch after a fatal step");
    assert_eq!(supervisor.state().await, SupervisorState::Preparing);
}

#[tokio::test]
async fn test_best_effort_failure_still_launches() {
    let (_listener, port) = local_listener().await;
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("server-started");

    let config = test_config(
        port,
        vec![step("collectstatic", &["false"], FailurePolicy::Continue)],
        &["touch", marker.to_str().unwrap()],
    );

    let mut supervisor = Supervisor::new(config);
    let exit_code = supervisor.run().await.unwrap();

    assert_eq!(exit_code, 0);
    assert!(marker.exists());
}

#[tokio::test]
async fn test_gate_exhaustion_aborts_startup() {
    // Reserved then dropped, so nothing is listening
    let (listener, port) = local_listener().await;
    drop(listener);

    let mut config = test_config(port, vec![], &["sh", "-c", "exit 0"]);
    config.dependency.max_attempts = Some(2);
    config.dependency.poll_interval_secs = 1;

    let mut supervisor = Supervisor::new(config);
    let err = supervisor.run().await.unwrap_err();
    assert!(matches!(err, BootgateError::Gate { attempts: 2, .. }));
}

#[tokio::test]
async fn test_shutdown_request_terminates_server_and_exits_zero() {
    let (_listener, port) = local_listener().await;

    let config = test_config(port, vec![], &["sleep", "30"]);
    let mut supervisor = Supervisor::new(config);

    let trigger = Arc::clone(&supervisor.shutdown_trigger);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        if let Some(sender) = trigger.lock().await.take() {
            let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
        }
    });

    let start = Instant::now();
    let exit_code = supervisor.run().await.unwrap();

    // Signal-triggered shutdown exits 0 even though the child was killed
    assert_eq!(exit_code, 0);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(supervisor.state().await, SupervisorState::ShuttingDown);
}

#[tokio::test]
async fn test_shutdown_requested_before_launch_still_exits_zero() {
    let (_listener, port) = local_listener().await;

    let config = test_config(port, vec![], &["sleep", "30"]);
    let mut supervisor = Supervisor::new(config);

    // Request arrives before the server is spawned; it must still be
    // honored once the supervisor reaches the launch step
    supervisor
        .request_shutdown(ShutdownReason::Signal("SIGTERM".to_string()))
        .await;

    let start = Instant::now();
    let exit_code = supervisor.run().await.unwrap();

    assert_eq!(exit_code, 0);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(supervisor.state().await, SupervisorState::ShuttingDown);
}

#[tokio::test]
async fn test_preflight_runs_gate_and_prepare_only() {
    let (_listener, port) = local_listener().await;
    let dir = tempfile::tempdir().unwrap();
    let prepared = dir.path().join("prepared");
    let launched = dir.path().join("launched");

    let config = test_config(
        port,
        vec![step(
            "migrate",
            &["touch", prepared.to_str().unwrap()],
            FailurePolicy::Abort,
        )],
        &["touch", launched.to_str().unwrap()],
    );

    let mut supervisor = Supervisor::new(config);
    supervisor.preflight().await.unwrap();

    assert!(prepared.exists());
    assert!(!launched.exists());
    assert_eq!(supervisor.state().await, SupervisorState::Preparing);
}
