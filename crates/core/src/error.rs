//! Error types for dvsource-core

use std::process::ExitStatus;

use thiserror::Error;

use crate::capabilities::DependencyReport;

/// Result type alias for dvsource-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can end a dvsource run
///
/// Pre-flight errors (`MissingDependency`, `InvalidConfiguration`) are raised
/// before any child process exists. `UnexpectedTermination` is only reported
/// after the shutdown protocol has run.
#[derive(Debug, Error)]
pub enum Error {
    /// A required executable or pipeline module could not be found
    #[error("{0}")]
    MissingDependency(DependencyReport),

    /// A configuration value was missing, malformed or unsupported
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The pipeline executor could not be started
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The supervised process exited while it was expected to keep running
    #[error("Pipeline process {pid} terminated unexpectedly ({status})")]
    UnexpectedTermination {
        /// Process ID of the child
        pid: u32,
        /// Exit status observed by the liveness check
        status: ExitStatus,
    },

    /// The supervisor has no running process to act on
    #[error("No running pipeline process")]
    NotRunning,

    /// The supervisor already owns a process
    #[error("Pipeline process {0} is already being supervised")]
    AlreadyStarted(u32),

    /// A pipeline descriptor failed structural validation
    #[error("Invalid pipeline descriptor: {0}")]
    InvalidDescriptor(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DependencyReport> for Error {
    fn from(report: DependencyReport) -> Self {
        Error::MissingDependency(report)
    }
}
