//! Start, monitor and shut down the pipeline executor

use std::future::Future;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use super::{ProcessState, ShutdownOutcome, SupervisedProcess};
use crate::capabilities::LAUNCH_PROGRAM;
use crate::config::Configuration;
use crate::pipeline::to_launch_args;
use crate::{Error, Result};

/// Liveness poll cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How the executor is launched and stopped
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Executor program
    pub program: PathBuf,

    /// Arguments placed before the pipeline tokens
    pub leading_args: Vec<String>,

    /// Delay between liveness checks
    pub poll_interval: Duration,

    /// Grace period between the stop request and the forced kill
    pub shutdown_timeout: Duration,

    /// Echo the command and keep the child's stdout
    pub verbose: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(LAUNCH_PROGRAM),
            leading_args: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown_timeout: Duration::from_secs(crate::config::DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            verbose: false,
        }
    }
}

impl SupervisorConfig {
    /// Settings for a resolved run configuration
    pub fn for_configuration(config: &Configuration) -> Self {
        Self {
            leading_args: if config.verbose {
                vec!["-v".to_string()]
            } else {
                Vec::new()
            },
            shutdown_timeout: config.shutdown_timeout,
            verbose: config.verbose,
            ..Default::default()
        }
    }
}

/// Owns one pipeline process for the duration of a run
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    process: Option<SupervisedProcess>,
}

impl ProcessSupervisor {
    /// Create a supervisor; nothing is spawned until [`start`](Self::start)
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            process: None,
        }
    }

    /// Supervisor settings
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// The supervised process, once started
    pub fn process(&self) -> Option<&SupervisedProcess> {
        self.process.as_ref()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ProcessState {
        self.process
            .as_ref()
            .map(SupervisedProcess::state)
            .unwrap_or(ProcessState::NotStarted)
    }

    /// Spawn the executor with the serialized pipeline
    ///
    /// Spawn failures are returned immediately; no monitoring takes place.
    pub fn start(&mut self, descriptor: &str) -> Result<&SupervisedProcess> {
        if let Some(process) = &self.process {
            return Err(Error::AlreadyStarted(process.id()));
        }

        let mut args = self.config.leading_args.clone();
        args.extend(to_launch_args(descriptor));

        if self.config.verbose {
            println!("Running the pipeline command of");
            println!("    {}", display_command(&self.config.program, &args));
        }

        let mut command = Command::new(&self.config.program);
        command.args(&args).stdin(Stdio::null());
        if !self.config.verbose {
            command.stdout(Stdio::null());
        }

        // Own process group: an operator Ctrl-C reaches only the supervisor
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn().map_err(|source| Error::Spawn {
            program: self.config.program.display().to_string(),
            source,
        })?;

        let process = SupervisedProcess::new(child);
        tracing::info!(
            "Pipeline process {} started ({})",
            process.id(),
            self.config.program.display()
        );

        Ok(self.process.insert(process))
    }

    /// Poll the process until it exits
    ///
    /// The supervisor always expects to be the one stopping the process, so
    /// any observed exit is unexpected: the state becomes
    /// [`ProcessState::CrashedUnexpectedly`] and the exit status is returned.
    pub async fn monitor(&mut self) -> Result<ExitStatus> {
        let poll_interval = self.config.poll_interval;
        let process = self
            .process
            .as_mut()
            .filter(|p| p.state == ProcessState::Running)
            .ok_or(Error::NotRunning)?;

        loop {
            if let Some(status) = process.poll_exit()? {
                process.state = ProcessState::CrashedUnexpectedly;
                tracing::error!(
                    "Pipeline process {} terminated unexpectedly after {:.1}s: {}",
                    process.id(),
                    process.uptime().as_secs_f64(),
                    status
                );
                return Ok(status);
            }

            tracing::debug!("Pipeline process {} happily running", process.id());

            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Stop the process: graceful request, bounded wait, then one forced kill
    ///
    /// Runs at most once per process; later calls return the first outcome.
    /// Failures of the stop and kill requests are logged, never returned.
    pub async fn shutdown(&mut self) -> ShutdownOutcome {
        let poll_interval = self.config.poll_interval;
        let timeout = self.config.shutdown_timeout;

        let Some(process) = self.process.as_mut() else {
            return ShutdownOutcome::NoProcess;
        };
        if let Some(outcome) = process.shutdown {
            return outcome;
        }

        let outcome = shutdown_protocol(process, poll_interval, timeout).await;
        process.shutdown = Some(outcome);
        outcome
    }

    /// Monitor until the process exits or `cancel` resolves, then shut down
    ///
    /// Returns the shutdown outcome after an operator cancellation, or
    /// [`Error::UnexpectedTermination`] (after shutdown) if the process
    /// exited by itself, including an exit first noticed by the shutdown.
    pub async fn run<F>(&mut self, cancel: F) -> Result<ShutdownOutcome>
    where
        F: Future<Output = ()>,
    {
        let pid = self.process.as_ref().map(SupervisedProcess::id).ok_or(Error::NotRunning)?;

        let result = tokio::select! {
            exited = self.monitor() => match exited {
                Ok(status) => Err(Error::UnexpectedTermination { pid, status }),
                Err(e) => Err(e),
            },
            _ = cancel => {
                tracing::info!("Stop requested, shutting down pipeline process {}", pid);
                Ok(())
            }
        };

        let outcome = self.shutdown().await;
        result?;

        // The child may have died between polls, before the cancel arrived
        let crashed = self
            .process
            .as_ref()
            .filter(|p| p.state() == ProcessState::CrashedUnexpectedly)
            .and_then(SupervisedProcess::exit_status);
        match crashed {
            Some(status) => Err(Error::UnexpectedTermination { pid, status }),
            None => Ok(outcome),
        }
    }
}

async fn shutdown_protocol(
    process: &mut SupervisedProcess,
    poll_interval: Duration,
    timeout: Duration,
) -> ShutdownOutcome {
    let deadline_base = Instant::now();
    let pid = process.id();

    if !process.is_alive() {
        if process.state == ProcessState::Running {
            process.state = ProcessState::CrashedUnexpectedly;
            tracing::error!(
                "Pipeline process {} terminated unexpectedly before shutdown",
                pid
            );
        }
        tracing::debug!("Pipeline process {} already exited, nothing to stop", pid);
        return ShutdownOutcome::AlreadyExited;
    }

    tracing::info!("Terminating pipeline process {}", pid);
    process.state = ProcessState::Terminating;
    if let Err(e) = process.request_terminate() {
        tracing::warn!("Error terminating pipeline process {}: {}", pid, e);
    }

    loop {
        if !process.is_alive() {
            process.state = ProcessState::Terminated;
            tracing::info!(
                "Pipeline process {} terminated after {:.1}s",
                pid,
                deadline_base.elapsed().as_secs_f64()
            );
            return ShutdownOutcome::Terminated;
        }

        if deadline_base.elapsed() >= timeout {
            tracing::warn!(
                "Timeout waiting for pipeline process {} to terminate, killing",
                pid
            );
            if let Err(e) = process.force_kill() {
                tracing::error!("Error killing pipeline process {}: {}", pid, e);
            }
            process.state = ProcessState::Killed;
            return ShutdownOutcome::Killed;
        }

        tracing::debug!("Waiting for pipeline process {} to terminate", pid);
        tokio::time::sleep(poll_interval).await;
    }
}

/// Command line as an operator would retype it in a shell
fn display_command(program: &std::path::Path, args: &[String]) -> String {
    std::iter::once(program.display().to_string())
        .chain(args.iter().map(|a| a.replace('(', "\\(").replace(')', "\\)")))
        .collect::<Vec<_>>()
        .join(" ")
}
