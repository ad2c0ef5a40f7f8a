//! Handle to the supervised child process

use std::io;
use std::process::{Child, ExitStatus};
use std::time::{Duration, Instant};

use super::{ProcessState, ShutdownOutcome};

/// Live handle: pid, lifecycle state and start time of the pipeline process
#[derive(Debug)]
pub struct SupervisedProcess {
    id: u32,
    pub(crate) state: ProcessState,
    started_at: Instant,
    child: Child,
    exit_status: Option<ExitStatus>,
    pub(crate) shutdown: Option<ShutdownOutcome>,
}

impl SupervisedProcess {
    pub(crate) fn new(child: Child) -> Self {
        Self {
            id: child.id(),
            state: ProcessState::Running,
            started_at: Instant::now(),
            child,
            exit_status: None,
            shutdown: None,
        }
    }

    /// OS process ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// When the process was spawned
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Time since spawn
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Exit status, once a liveness check has observed it
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Result of the shutdown protocol, once it has run
    pub fn shutdown_outcome(&self) -> Option<ShutdownOutcome> {
        self.shutdown
    }

    /// Non-blocking exit check
    pub(crate) fn poll_exit(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.exit_status.is_some() {
            return Ok(self.exit_status);
        }
        let status = self.child.try_wait()?;
        self.exit_status = status;
        Ok(status)
    }

    /// Whether the process is still running
    ///
    /// A failing check means the child can no longer be waited on, which is
    /// treated as gone.
    pub fn is_alive(&mut self) -> bool {
        match self.poll_exit() {
            Ok(status) => status.is_none(),
            Err(e) => {
                tracing::warn!("Liveness check for process {} failed: {}", self.id, e);
                false
            }
        }
    }

    /// Ask the process to stop (SIGTERM on Unix)
    pub(crate) fn request_terminate(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.id as i32);
            kill(pid, Signal::SIGTERM).map_err(io::Error::from)
        }

        #[cfg(not(unix))]
        {
            // No graceful stop request without signals
            self.child.kill()
        }
    }

    /// Stop the process unconditionally
    ///
    /// Does not wait for the exit: a child stuck in the kernel may take a
    /// while to die.
    pub(crate) fn force_kill(&mut self) -> io::Result<()> {
        self.child.kill()?;
        self.poll_exit()?;
        Ok(())
    }
}
