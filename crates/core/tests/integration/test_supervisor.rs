//! Integration tests for the pipeline process supervisor
//!
//! `sh -c` stands in for the executor so each test controls exactly how the
//! child behaves: exiting early, honouring SIGTERM, or ignoring it.

#![cfg(unix)]

use std::future::pending;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use dvsource_core::process::{ProcessState, ProcessSupervisor, ShutdownOutcome, SupervisorConfig};
use dvsource_core::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn shell(script: &str, shutdown_timeout: Duration) -> ProcessSupervisor {
    shell_polling(script, shutdown_timeout, POLL_INTERVAL)
}

fn shell_polling(script: &str, shutdown_timeout: Duration, poll_interval: Duration) -> ProcessSupervisor {
    ProcessSupervisor::new(SupervisorConfig {
        program: PathBuf::from("sh"),
        leading_args: vec!["-c".to_string(), script.to_string()],
        poll_interval,
        shutdown_timeout,
        verbose: false,
    })
}

#[test]
fn test_spawn_failure_is_reported_immediately() {
    let mut supervisor = ProcessSupervisor::new(SupervisorConfig {
        program: PathBuf::from("/nonexistent/gst-launch-1.0"),
        ..Default::default()
    });

    let err = supervisor.start("fakesrc ! fakesink").unwrap_err();
    assert!(matches!(err, Error::Spawn { .. }));
    assert!(err.to_string().contains("/nonexistent/gst-launch-1.0"));
    assert_eq!(supervisor.state(), ProcessState::NotStarted);
    assert!(supervisor.process().is_none());
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let mut supervisor = shell("exec sleep 30", Duration::from_secs(2));
    let pid = supervisor.start("").unwrap().id();

    assert!(matches!(
        supervisor.start(""),
        Err(Error::AlreadyStarted(id)) if id == pid
    ));

    assert_eq!(supervisor.shutdown().await, ShutdownOutcome::Terminated);
}

#[tokio::test]
async fn test_unexpected_exit_still_runs_shutdown() {
    let mut supervisor = shell("exit 3", Duration::from_secs(2));
    let pid = supervisor.start("").unwrap().id();

    let err = supervisor.run(pending::<()>()).await.unwrap_err();
    match err {
        Error::UnexpectedTermination { pid: reported, status } => {
            assert_eq!(reported, pid);
            assert_eq!(status.code(), Some(3));
        }
        other => panic!("unexpected error: {other}"),
    }

    let process = supervisor.process().unwrap();
    assert_eq!(process.state(), ProcessState::CrashedUnexpectedly);
    assert_eq!(process.shutdown_outcome(), Some(ShutdownOutcome::AlreadyExited));
    assert_eq!(process.exit_status().and_then(|s| s.code()), Some(3));
}

#[tokio::test]
async fn test_exit_between_polls_is_not_a_clean_stop() {
    // Dies after the first liveness check; the cancel lands before the next one
    let mut supervisor = shell_polling("sleep 0.2; exit 3", Duration::from_secs(2), Duration::from_secs(1));
    let pid = supervisor.start("").unwrap().id();

    let err = supervisor
        .run(tokio::time::sleep(Duration::from_millis(600)))
        .await
        .unwrap_err();
    match err {
        Error::UnexpectedTermination { pid: reported, status } => {
            assert_eq!(reported, pid);
            assert_eq!(status.code(), Some(3));
        }
        other => panic!("unexpected error: {other}"),
    }

    let process = supervisor.process().unwrap();
    assert_eq!(process.state(), ProcessState::CrashedUnexpectedly);
    assert_eq!(process.shutdown_outcome(), Some(ShutdownOutcome::AlreadyExited));
}

#[tokio::test]
async fn test_cancellation_terminates_gracefully() {
    let mut supervisor = shell("exec sleep 30", Duration::from_secs(5));
    supervisor.start("").unwrap();

    let started = Instant::now();
    let outcome = supervisor
        .run(tokio::time::sleep(Duration::from_millis(200)))
        .await
        .unwrap();

    assert_eq!(outcome, ShutdownOutcome::Terminated);
    assert_eq!(supervisor.state(), ProcessState::Terminated);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_ignored_stop_request_is_killed_after_timeout() {
    let timeout = Duration::from_secs(1);
    let mut supervisor = shell("trap '' TERM; while :; do sleep 0.1; done", timeout);
    supervisor.start("").unwrap();

    // Give the shell time to install its trap
    tokio::time::sleep(Duration::from_millis(300)).await;

    let started = Instant::now();
    let outcome = supervisor.shutdown().await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, ShutdownOutcome::Killed);
    assert_eq!(supervisor.state(), ProcessState::Killed);
    assert!(elapsed >= timeout, "killed too early: {:?}", elapsed);
    assert!(
        elapsed <= timeout + POLL_INTERVAL + Duration::from_millis(150),
        "killed more than one poll late: {:?}",
        elapsed
    );

    // Second call returns the recorded outcome without signalling again
    let again = Instant::now();
    assert_eq!(supervisor.shutdown().await, ShutdownOutcome::Killed);
    assert!(again.elapsed() < Duration::from_millis(50));
}

#[tokio::test]
async fn test_shutdown_after_exit_sends_nothing() {
    let mut supervisor = shell("exit 0", Duration::from_secs(1));
    supervisor.start("").unwrap();

    let status = supervisor.monitor().await.unwrap();
    assert!(status.success());
    assert_eq!(supervisor.state(), ProcessState::CrashedUnexpectedly);

    assert_eq!(supervisor.shutdown().await, ShutdownOutcome::AlreadyExited);
    assert_eq!(supervisor.shutdown().await, ShutdownOutcome::AlreadyExited);
    assert!(matches!(supervisor.monitor().await, Err(Error::NotRunning)));
}

#[tokio::test]
async fn test_launch_tokens_reach_the_child() {
    // $0 is the first token after the script; the child exits with the token count
    let mut supervisor = shell("exit $#", Duration::from_secs(1));
    supervisor
        .start("videotestsrc is-live=true ! fakesink")
        .unwrap();

    let status = supervisor.monitor().await.unwrap();
    assert_eq!(status.code(), Some(3));
}
