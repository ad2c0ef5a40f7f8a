//! Geometry and frame-rate lookup tables
//!
//! Every lookup is an exhaustive `match` over typed keys, so a missing
//! combination fails to compile and a duplicated one is a denied
//! unreachable-pattern error.

#![deny(unreachable_patterns)]

use serde::{Deserialize, Serialize};

use super::graph::{Caps, Fraction};
use crate::config::{AspectRatio, VideoStandard};

/// Pixel format accepted by the mixer sink
pub const OUTPUT_PIXEL_FORMAT: &str = "Y41B";

/// Raw video media type
pub const RAW_VIDEO: &str = "video/x-raw";

/// Raw audio media type
pub const RAW_AUDIO: &str = "audio/x-raw";

/// Frame size plus pixel aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Width-to-height ratio of one pixel
    pub pixel_aspect: Fraction,
}

impl Geometry {
    const fn new(width: u32, height: u32, par_num: u32, par_den: u32) -> Self {
        Self {
            width,
            height,
            pixel_aspect: Fraction::new(par_num, par_den),
        }
    }

    /// Raw video caps pinning this geometry
    pub fn caps(&self) -> Caps {
        Caps::new(RAW_VIDEO)
            .field("width", self.width)
            .field("height", self.height)
            .field("pixel-aspect-ratio", self.pixel_aspect)
    }
}

/// First level: square-pixel frame with borders added to reach the aspect
pub fn padded_geometry(aspect: AspectRatio) -> Geometry {
    match aspect {
        AspectRatio::FourThree => Geometry::new(1024, 768, 1, 1),
        AspectRatio::SixteenNine => Geometry::new(1280, 720, 1, 1),
    }
}

/// Second level: broadcast frame with the standard's non-square pixels
///
/// PAR values follow the NLE convention rather than ITU-R BT.601.
pub fn broadcast_geometry(standard: VideoStandard, aspect: AspectRatio) -> Geometry {
    match (standard, aspect) {
        (VideoStandard::Ntsc, AspectRatio::FourThree) => Geometry::new(720, 480, 8, 9),
        (VideoStandard::Ntsc, AspectRatio::SixteenNine) => Geometry::new(720, 480, 32, 27),
        (VideoStandard::Pal, AspectRatio::FourThree) => Geometry::new(720, 576, 16, 15),
        (VideoStandard::Pal, AspectRatio::SixteenNine) => Geometry::new(720, 576, 64, 45),
    }
}

/// Output frame rate of a standard
pub fn frame_rate(standard: VideoStandard) -> Fraction {
    match standard {
        VideoStandard::Ntsc => Fraction::new(30000, 1001),
        VideoStandard::Pal => Fraction::new(25, 1),
    }
}

/// The second-level table, one row per (standard, aspect) pair
pub fn broadcast_geometry_table() -> Vec<((VideoStandard, AspectRatio), Geometry)> {
    VideoStandard::ALL
        .iter()
        .flat_map(|&standard| {
            AspectRatio::ALL
                .iter()
                .map(move |&aspect| ((standard, aspect), broadcast_geometry(standard, aspect)))
        })
        .collect()
}
