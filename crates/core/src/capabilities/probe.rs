//! Presence probes for executables and pipeline modules

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::INSPECT_PROGRAM;

/// Answers "is this installed?" for a single capability
pub trait CapabilityProbe {
    /// Resolve an executable, returning where it was found
    fn locate_executable(&self, name: &str) -> Option<PathBuf>;

    /// Whether the pipeline inspector knows about a module
    fn has_module(&self, name: &str) -> bool;
}

/// Probe backed by `PATH` and an inspection sub-process
#[derive(Debug, Clone)]
pub struct SystemProbe {
    /// Program invoked as `<inspect_program> <module>`
    pub inspect_program: PathBuf,

    /// Search path override; the process `PATH` when unset
    pub search_path: Option<OsString>,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self {
            inspect_program: PathBuf::from(INSPECT_PROGRAM),
            search_path: None,
        }
    }
}

impl CapabilityProbe for SystemProbe {
    fn locate_executable(&self, name: &str) -> Option<PathBuf> {
        if name.contains(std::path::MAIN_SEPARATOR) {
            let path = PathBuf::from(name);
            return is_executable(&path).then_some(path);
        }

        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"))?;

        std::env::split_paths(&search_path)
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    }

    fn has_module(&self, name: &str) -> bool {
        // A non-zero status means "module absent", not a separate failure.
        match Command::new(&self.inspect_program)
            .arg(name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::debug!(
                    "Failed to run {} for module {}: {}",
                    self.inspect_program.display(),
                    name,
                    e
                );
                false
            }
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
