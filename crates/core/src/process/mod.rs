//! Pipeline process supervision
//!
//! The supervisor spawns the executor with a serialized pipeline, polls it
//! for liveness, and always stops it with the graceful-then-forced shutdown
//! protocol, whether the run ends by operator cancellation or because the
//! child exited on its own.

mod handle;
mod supervisor;

pub use handle::SupervisedProcess;
pub use supervisor::{ProcessSupervisor, SupervisorConfig, DEFAULT_POLL_INTERVAL};

use serde::Serialize;

/// Lifecycle of the supervised process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Nothing spawned yet
    NotStarted,
    /// Spawned and expected to keep running
    Running,
    /// Stop requested, waiting for exit
    Terminating,
    /// Exited after the stop request (or before it was needed)
    Terminated,
    /// Forced kill sent after the shutdown timeout
    Killed,
    /// Exited on its own while running
    CrashedUnexpectedly,
}

/// How the shutdown protocol ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownOutcome {
    /// There was no process to stop
    NoProcess,
    /// The process had already exited; nothing was sent
    AlreadyExited,
    /// The process exited after the graceful stop request
    Terminated,
    /// The timeout passed and a forced kill was sent
    Killed,
}
