//! Pipeline description
//!
//! - [`graph`] - stage graph data structures
//! - [`tables`] - geometry and frame-rate lookups
//! - [`builder`] - [`build`]: configuration to descriptor
//! - [`launch`] - descriptor to executor syntax

pub mod builder;
pub mod graph;
pub mod launch;
pub mod tables;

pub use builder::{build, MUXER_NAME, TEE_NAME};
pub use graph::{Caps, Edge, Fraction, Param, PipelineDescriptor, Stage, StageId, StageKind, Value};
pub use launch::{to_launch_args, to_launch_string};
pub use tables::Geometry;
