//! Pre-flight capability checks
//!
//! Before anything is spawned, every executable and pipeline module the run
//! could need is probed. The first missing one aborts the run with a
//! [`DependencyReport`] naming it and, where known, the package providing it.

mod probe;

pub use probe::{CapabilityProbe, SystemProbe};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Executable used to launch pipelines
pub const LAUNCH_PROGRAM: &str = "gst-launch-1.0";

/// Executable used to query pipeline modules
pub const INSPECT_PROGRAM: &str = "gst-inspect-1.0";

const DVSWITCH_HELP: &str = "\
If your distro doesn't ship the gstreamer1.0-dvswitch package you
can find out more information in the README.md file or at
https://github.com/timvideos/dvsource-v4l2-other#installing-the-gstreamer-dvswitch-plugin";

/// What kind of thing a requirement names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityKind {
    /// A program resolvable on `PATH`
    Executable,
    /// A module known to the pipeline inspector
    Module,
}

/// A named external executable or pipeline module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRequirement {
    /// Executable or module name
    pub name: String,

    /// Whether this is a program or a pipeline module
    pub kind: CapabilityKind,

    /// Distribution package that provides it
    #[serde(default)]
    pub package: Option<String>,

    /// Additional remediation text
    #[serde(default)]
    pub extra_help: Option<String>,
}

impl CapabilityRequirement {
    /// Require an executable on `PATH`
    pub fn executable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CapabilityKind::Executable,
            package: None,
            extra_help: None,
        }
    }

    /// Require a pipeline module
    pub fn module(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CapabilityKind::Module,
            package: None,
            extra_help: None,
        }
    }

    /// Attach the package that provides this requirement
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Attach free-form remediation text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.extra_help = Some(help.into());
        self
    }
}

/// Why a dependency check failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    /// Name of the first missing requirement
    pub name: String,

    /// Kind of the missing requirement
    pub kind: CapabilityKind,

    /// Package to install, if known
    pub package: Option<String>,

    /// Additional remediation text, if any
    pub extra_help: Option<String>,
}

impl DependencyReport {
    fn missing(requirement: &CapabilityRequirement) -> Self {
        Self {
            name: requirement.name.clone(),
            kind: requirement.kind,
            package: requirement.package.clone(),
            extra_help: requirement.extra_help.clone(),
        }
    }
}

impl fmt::Display for DependencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CapabilityKind::Executable => write!(f, "Unable to find required command: {}", self.name)?,
            CapabilityKind::Module => {
                write!(f, "Unable to find required gstreamer module {}", self.name)?
            }
        }
        if let Some(package) = &self.package {
            write!(f, "\nPlease try 'sudo apt-get install {}'", package)?;
        }
        if let Some(help) = &self.extra_help {
            write!(f, "\n{}", help.trim())?;
        }
        Ok(())
    }
}

impl std::error::Error for DependencyReport {}

/// Every capability a run may reach
///
/// Both source variants and the preview sink are included: which branch is
/// used is only decided when the pipeline is spawned.
pub fn standard_requirements() -> Vec<CapabilityRequirement> {
    use CapabilityRequirement as Req;

    const TOOLS: &str = "gstreamer1.0-tools";
    const GOOD: &str = "gstreamer1.0-plugins-good";
    const BASE: &str = "gstreamer1.0-plugins-base";
    const CORE: &str = "libgstreamer1.0-0";
    const LIBAV: &str = "gstreamer1.0-libav";

    vec![
        Req::executable(INSPECT_PROGRAM).with_package(TOOLS),
        Req::executable(LAUNCH_PROGRAM).with_package(TOOLS),
        Req::module("v4l2src").with_package(GOOD),
        Req::module("decodebin").with_package(BASE),
        Req::module("videotestsrc").with_package(BASE),
        Req::module("videoscale").with_package(BASE),
        Req::module("videorate").with_package(BASE),
        Req::module("queue").with_package(CORE),
        Req::module("tee").with_package(CORE),
        Req::module("videoconvert").with_package(LIBAV),
        Req::module("avenc_dvvideo").with_package(LIBAV),
        Req::module("avmux_dv").with_package(LIBAV),
        Req::module("dvswitchsink")
            .with_package("gstreamer1.0-dvswitch")
            .with_help(DVSWITCH_HELP),
        Req::module("audiotestsrc").with_package(BASE),
        Req::module("xvimagesink").with_package(BASE),
    ]
}

/// Runs capability probes in order, stopping at the first failure
pub struct DependencyChecker<P = SystemProbe> {
    probe: P,
}

impl DependencyChecker<SystemProbe> {
    /// Checker backed by `PATH` lookups and the system pipeline inspector
    pub fn system() -> Self {
        Self::new(SystemProbe::default())
    }
}

impl<P: CapabilityProbe> DependencyChecker<P> {
    /// Create a checker using the given probe
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    /// Verify that every requirement is present
    ///
    /// Fails on the first missing requirement; later ones are not probed.
    pub fn verify(&self, requirements: &[CapabilityRequirement]) -> Result<(), DependencyReport> {
        for requirement in requirements {
            match requirement.kind {
                CapabilityKind::Executable => match self.probe.locate_executable(&requirement.name) {
                    Some(path) => {
                        tracing::debug!("Using {} found at {}", requirement.name, path.display());
                    }
                    None => return Err(DependencyReport::missing(requirement)),
                },
                CapabilityKind::Module => {
                    if !self.probe.has_module(&requirement.name) {
                        return Err(DependencyReport::missing(requirement));
                    }
                    tracing::trace!("Found gstreamer module {}", requirement.name);
                }
            }
        }

        tracing::info!("All {} capability checks passed", requirements.len());
        Ok(())
    }
}
