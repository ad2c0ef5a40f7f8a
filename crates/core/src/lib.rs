//! dvsource core - pipeline description, dependency checks and supervision
//!
//! This crate provides everything the `dvsource-v4l2-other` tool needs to
//! turn a V4L2 device (or a generated test pattern) into a DV stream for a
//! dvswitch mixer, without linking GStreamer itself.
//!
//! # Architecture
//!
//! - [`capabilities`] - pre-flight check that the executor and every pipeline
//!   module are installed
//! - [`config`] - resolved run configuration and `.dvswitchrc` defaults
//! - [`pipeline`] - typed stage graph, built from a configuration and
//!   serialized to gst-launch syntax
//! - [`process`] - spawn, monitor and stop the `gst-launch-1.0` child
//!
//! # Example
//!
//! ```ignore
//! use dvsource_core::capabilities::{standard_requirements, DependencyChecker};
//! use dvsource_core::config::{Options, RcFile};
//! use dvsource_core::pipeline::{build, to_launch_string};
//! use dvsource_core::process::{ProcessSupervisor, SupervisorConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> dvsource_core::Result<()> {
//!     let config = Options::default().resolve(&RcFile::load()?)?;
//!     DependencyChecker::system().verify(&standard_requirements())?;
//!
//!     let descriptor = to_launch_string(&build(&config))?;
//!     let mut supervisor = ProcessSupervisor::new(SupervisorConfig::for_configuration(&config));
//!     supervisor.start(&descriptor)?;
//!     supervisor.run(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capabilities;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod process;

pub use error::{Error, Result};
