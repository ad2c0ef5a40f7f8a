//! Run configuration
//!
//! [`Options`] is the raw, CLI-shaped input. [`Options::resolve`] merges it
//! with the `.dvswitchrc` settings, applies defaults and validates it into an
//! immutable [`Configuration`]. Nothing downstream reads ambient state.

pub mod rc_file;

pub use rc_file::RcFile;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// The only audio sample rate the mixer accepts
pub const SUPPORTED_AUDIO_RATE: u32 = 48_000;

/// Sample rates that can be requested; all but 48 kHz are rejected
pub const KNOWN_AUDIO_RATES: [u32; 3] = [48_000, 44_100, 32_000];

/// Default capture device
pub const DEFAULT_DEVICE: &str = "/dev/video0";

/// Default seconds to wait for the child after a graceful stop request
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Broadcast video standard of the DV output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStandard {
    /// 525 lines, 30000/1001 fps
    Ntsc,
    /// 625 lines, 25 fps
    Pal,
}

impl VideoStandard {
    /// Every standard, in declaration order
    pub const ALL: [VideoStandard; 2] = [VideoStandard::Ntsc, VideoStandard::Pal];

    /// Lowercase name as used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStandard::Ntsc => "ntsc",
            VideoStandard::Pal => "pal",
        }
    }
}

impl fmt::Display for VideoStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoStandard {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ntsc" => Ok(VideoStandard::Ntsc),
            "pal" => Ok(VideoStandard::Pal),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown video system '{}' (expected ntsc or pal)",
                other
            ))),
        }
    }
}

/// Display aspect ratio of the DV output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 4:3
    #[serde(rename = "4:3")]
    FourThree,
    /// 16:9 (anamorphic)
    #[serde(rename = "16:9")]
    SixteenNine,
}

impl AspectRatio {
    /// Every aspect ratio, in declaration order
    pub const ALL: [AspectRatio; 2] = [AspectRatio::FourThree, AspectRatio::SixteenNine];

    /// `W:H` form
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::FourThree => "4:3",
            AspectRatio::SixteenNine => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "4:3" => Ok(AspectRatio::FourThree),
            "16:9" => Ok(AspectRatio::SixteenNine),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown aspect ratio '{}' (expected 4:3 or 16:9)",
                other
            ))),
        }
    }
}

macro_rules! test_patterns {
    ($($(#[$attr:meta])* $variant:ident = $id:literal => $name:literal),+ $(,)?) => {
        /// Synthetic picture generated instead of reading a device
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "kebab-case")]
        pub enum TestPattern {
            $(
                #[allow(missing_docs)]
                $(#[$attr])*
                $variant,
            )+
        }

        impl TestPattern {
            /// Every pattern, ordered by id
            pub const ALL: &'static [TestPattern] = &[$(TestPattern::$variant),+];

            /// Numeric id understood by the test source
            pub fn id(&self) -> u32 {
                match self {
                    $(TestPattern::$variant => $id,)+
                }
            }

            /// Name accepted on the command line
            pub fn name(&self) -> &'static str {
                match self {
                    $(TestPattern::$variant => $name,)+
                }
            }
        }
    };
}

test_patterns! {
    #[default]
    Smpte = 0 => "smpte",
    Snow = 1 => "snow",
    Black = 2 => "black",
    White = 3 => "white",
    Red = 4 => "red",
    Green = 5 => "green",
    Blue = 6 => "blue",
    Checkers1 = 7 => "checkers-1",
    Checkers2 = 8 => "checkers-2",
    Checkers4 = 9 => "checkers-4",
    Checkers8 = 10 => "checkers-8",
    Circular = 11 => "circular",
    Blink = 12 => "blink",
    Smpte75 = 13 => "smpte75",
    ZonePlate = 14 => "zone-plate",
    Gamut = 15 => "gamut",
    ChromaZonePlate = 16 => "chroma-zone-plate",
    SolidColor = 17 => "solid-color",
    Ball = 18 => "ball",
    Smpte100 = 19 => "smpte100",
    Bar = 20 => "bar",
    Pinwheel = 21 => "pinwheel",
    Spokes = 22 => "spokes",
    Gradient = 23 => "gradient",
    Colors = 24 => "colors",
}

impl fmt::Display for TestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TestPattern {
    type Err = Error;

    /// An empty name selects the default pattern
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(TestPattern::default());
        }
        TestPattern::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| Error::InvalidConfiguration(format!("unknown test pattern '{}'", s)))
    }
}

/// Where the video comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSource {
    /// A Video4Linux2 capture device
    Device {
        /// Device node, e.g. `/dev/video0`
        path: PathBuf,
        /// Caps forced on the device output, inserted verbatim
        caps: Option<String>,
    },
    /// Generated test picture
    TestPattern(TestPattern),
}

/// Raw audio format fed to the muxer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Number of channels
    pub channels: u32,
    /// Sample rate in Hz
    pub rate: u32,
    /// Bits per sample
    pub depth: u32,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            channels: 2,
            rate: SUPPORTED_AUDIO_RATE,
            depth: 16,
        }
    }
}

/// Network address of the mixer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host name or IP literal
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Fully resolved and validated run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Video input
    pub source: VideoSource,

    /// Output video standard
    pub standard: VideoStandard,

    /// Output aspect ratio
    pub aspect: AspectRatio,

    /// Audio format of the generated audio track
    pub audio: AudioFormat,

    /// Also show the video locally
    pub preview: bool,

    /// Echo the pipeline command and keep the child's stdout
    pub verbose: bool,

    /// Mixer endpoint
    pub endpoint: Endpoint,

    /// Source id for mixers with downstream routing (c3voc mode)
    pub routing_id: Option<u32>,

    /// How long to wait after a graceful stop before killing the child
    pub shutdown_timeout: Duration,
}

/// Unvalidated options as collected from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Capture device
    pub device: PathBuf,
    /// Caps override for the capture device; empty means none
    pub caps: Option<String>,
    /// Use a test pattern instead of the device
    pub fake: Option<TestPattern>,
    /// Output video standard
    pub standard: VideoStandard,
    /// Output aspect ratio
    pub aspect: AspectRatio,
    /// Requested audio sample rate in Hz
    pub rate: u32,
    /// Local preview
    pub display: bool,
    /// Verbose output
    pub verbose: bool,
    /// Mixer host, falls back to `MIXER_HOST`
    pub host: Option<String>,
    /// Mixer port, falls back to `MIXER_PORT`
    pub port: Option<String>,
    /// Shutdown timeout in seconds
    pub timeout_secs: u64,
    /// Routing source id; negative means unset
    pub c3voc: i64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            caps: None,
            fake: None,
            standard: VideoStandard::Pal,
            aspect: AspectRatio::FourThree,
            rate: SUPPORTED_AUDIO_RATE,
            display: false,
            verbose: false,
            host: None,
            port: None,
            timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            c3voc: -1,
        }
    }
}

impl Options {
    /// Apply `.dvswitchrc` fallbacks and validate
    pub fn resolve(self, rc: &RcFile) -> Result<Configuration> {
        if !KNOWN_AUDIO_RATES.contains(&self.rate) {
            return Err(Error::InvalidConfiguration(format!(
                "unknown audio rate {} Hz",
                self.rate
            )));
        }
        if self.rate != SUPPORTED_AUDIO_RATE {
            return Err(Error::InvalidConfiguration(format!(
                "only a --rate of {} is supported, got {}",
                SUPPORTED_AUDIO_RATE, self.rate
            )));
        }

        let host = self
            .host
            .or_else(|| rc.mixer_host().map(str::to_string))
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                Error::InvalidConfiguration(
                    "no mixer host: pass --host or set MIXER_HOST in .dvswitchrc".to_string(),
                )
            })?;

        let port = self
            .port
            .or_else(|| rc.mixer_port().map(str::to_string))
            .ok_or_else(|| {
                Error::InvalidConfiguration(
                    "no mixer port: pass --port or set MIXER_PORT in .dvswitchrc".to_string(),
                )
            })?;
        let port = port.trim().parse::<u16>().map_err(|_| {
            Error::InvalidConfiguration(format!("invalid mixer port '{}'", port))
        })?;

        let routing_id = match self.c3voc {
            id if id < 0 => None,
            id => Some(u32::try_from(id).map_err(|_| {
                Error::InvalidConfiguration(format!("c3voc source id {} is out of range", id))
            })?),
        };

        let source = match self.fake {
            Some(pattern) => VideoSource::TestPattern(pattern),
            None => VideoSource::Device {
                path: self.device,
                caps: self.caps.filter(|c| !c.trim().is_empty()),
            },
        };

        Ok(Configuration {
            source,
            standard: self.standard,
            aspect: self.aspect,
            audio: AudioFormat {
                rate: self.rate,
                ..AudioFormat::default()
            },
            preview: self.display,
            verbose: self.verbose,
            endpoint: Endpoint { host, port },
            routing_id,
            shutdown_timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn options() -> Options {
        Options {
            host: Some("mixer.local".to_string()),
            port: Some("2000".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let config = options().resolve(&RcFile::default()).unwrap();

        assert_eq!(
            config.source,
            VideoSource::Device {
                path: PathBuf::from("/dev/video0"),
                caps: None
            }
        );
        assert_eq!(config.standard, VideoStandard::Pal);
        assert_eq!(config.aspect, AspectRatio::FourThree);
        assert_eq!(config.audio, AudioFormat { channels: 2, rate: 48_000, depth: 16 });
        assert_eq!(config.endpoint.to_string(), "mixer.local:2000");
        assert_eq!(config.routing_id, None);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_unsupported_rate_rejected() {
        for rate in [44_100, 32_000] {
            let err = Options { rate, ..options() }.resolve(&RcFile::default()).unwrap_err();
            assert!(matches!(err, Error::InvalidConfiguration(_)), "{:?}", err);
        }

        let err = Options { rate: 22_050, ..options() }.resolve(&RcFile::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn test_host_and_port_required() {
        let err = Options { host: None, ..options() }.resolve(&RcFile::default()).unwrap_err();
        assert!(err.to_string().contains("MIXER_HOST"));

        let err = Options { port: None, ..options() }.resolve(&RcFile::default()).unwrap_err();
        assert!(err.to_string().contains("MIXER_PORT"));

        let err = Options { port: Some("http".into()), ..options() }
            .resolve(&RcFile::default())
            .unwrap_err();
        assert!(err.to_string().contains("invalid mixer port"));
    }

    #[test]
    fn test_negative_routing_id_is_absent() {
        let config = Options { c3voc: -5, ..options() }.resolve(&RcFile::default()).unwrap();
        assert_eq!(config.routing_id, None);

        let config = Options { c3voc: 0, ..options() }.resolve(&RcFile::default()).unwrap();
        assert_eq!(config.routing_id, Some(0));
    }

    #[test]
    fn test_fake_source_and_empty_caps() {
        let config = Options {
            fake: Some(TestPattern::Ball),
            ..options()
        }
        .resolve(&RcFile::default())
        .unwrap();
        assert_eq!(config.source, VideoSource::TestPattern(TestPattern::Ball));

        let config = Options {
            caps: Some("  ".into()),
            ..options()
        }
        .resolve(&RcFile::default())
        .unwrap();
        assert!(matches!(config.source, VideoSource::Device { caps: None, .. }));
    }

    #[test]
    fn test_pattern_ids_and_names_are_distinct() {
        let ids: HashSet<u32> = TestPattern::ALL.iter().map(|p| p.id()).collect();
        let names: HashSet<&str> = TestPattern::ALL.iter().map(|p| p.name()).collect();
        assert_eq!(ids.len(), TestPattern::ALL.len());
        assert_eq!(names.len(), TestPattern::ALL.len());

        for pattern in TestPattern::ALL {
            assert_eq!(pattern.name().parse::<TestPattern>().unwrap(), *pattern);
        }
        assert_eq!(TestPattern::default(), TestPattern::Smpte);
        assert_eq!("".parse::<TestPattern>().unwrap(), TestPattern::Smpte);
        assert!("plaid".parse::<TestPattern>().is_err());
    }

    #[test]
    fn test_parse_axes() {
        assert_eq!("NTSC".parse::<VideoStandard>().unwrap(), VideoStandard::Ntsc);
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::SixteenNine);
        assert!("secam".parse::<VideoStandard>().is_err());
        assert!("21:9".parse::<AspectRatio>().is_err());
    }
}
