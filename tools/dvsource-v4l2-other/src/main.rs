//! dvsource-v4l2-other - feed a dvswitch mixer from any V4L2 device
//!
//! Builds a gst-launch pipeline that rescales, rate-converts and DV-encodes
//! the device (or a generated test pattern), then supervises the
//! `gst-launch-1.0` process until the operator stops it.
//!
//! # Usage
//!
//! ```bash
//! # Webcam into a PAL 4:3 mixer configured in ~/.dvswitchrc
//! dvsource-v4l2-other -d /dev/video1
//!
//! # NTSC 16:9 test pattern with a local preview window
//! dvsource-v4l2-other -n ball -s ntsc -a 16:9 -x -h mixer.local -p 2000
//! ```

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dvsource_core::capabilities::{standard_requirements, DependencyChecker};
use dvsource_core::config::{AspectRatio, Options, RcFile, TestPattern, VideoStandard};
use dvsource_core::config::{DEFAULT_DEVICE, DEFAULT_SHUTDOWN_TIMEOUT_SECS, SUPPORTED_AUDIO_RATE};
use dvsource_core::pipeline::{build, to_launch_string};
use dvsource_core::process::{ProcessSupervisor, SupervisorConfig};

/// Stream a V4L2 device or test pattern to a dvswitch mixer
#[derive(Parser, Debug)]
#[command(name = "dvsource-v4l2-other")]
#[command(author, version)]
#[command(disable_help_flag = true)]
struct Args {
    /// Video device to read from
    #[arg(short, long, default_value = DEFAULT_DEVICE)]
    device: PathBuf,

    /// Caps inserted verbatim after the device source
    #[arg(short, long)]
    caps: Option<String>,

    /// Use a generated test pattern instead of the device (default: smpte)
    #[arg(short = 'n', long = "fake", value_name = "PATTERN", num_args = 0..=1, default_missing_value = "")]
    fake: Option<TestPattern>,

    /// Video standard: ntsc or pal
    #[arg(short = 's', long = "system", default_value_t = VideoStandard::Pal)]
    standard: VideoStandard,

    /// Picture aspect ratio: 4:3 or 16:9
    #[arg(short, long, default_value_t = AspectRatio::FourThree)]
    aspect: AspectRatio,

    /// Audio sample rate in Hz: 48000, 44100 or 32000
    #[arg(short, long, default_value_t = SUPPORTED_AUDIO_RATE)]
    rate: u32,

    /// Show a local preview window
    #[arg(short = 'x', long)]
    display: bool,

    /// Show the pipeline command and executor output
    #[arg(short, long)]
    verbose: bool,

    /// Mixer host (default: MIXER_HOST from .dvswitchrc)
    #[arg(short, long)]
    host: Option<String>,

    /// Mixer port (default: MIXER_PORT from .dvswitchrc)
    #[arg(short, long)]
    port: Option<String>,

    /// Seconds to wait for the pipeline to stop before killing it
    #[arg(short, long, default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    timeout: u64,

    /// c3voc source id; negative disables routing
    #[arg(short = '3', long, default_value_t = -1)]
    c3voc: i64,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl From<Args> for Options {
    fn from(args: Args) -> Self {
        Options {
            device: args.device,
            caps: args.caps,
            fake: args.fake,
            standard: args.standard,
            aspect: args.aspect,
            rate: args.rate,
            display: args.display,
            verbose: args.verbose,
            host: args.host,
            port: args.port,
            timeout_secs: args.timeout,
            c3voc: args.c3voc,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let rc = RcFile::load().context("Failed to read .dvswitchrc")?;
    tracing::debug!("Loaded settings from {:?}", rc.sources());

    let config = Options::from(args)
        .resolve(&rc)
        .context("Invalid configuration")?;
    tracing::debug!(
        "Resolved configuration: {}",
        serde_json::to_string(&config).context("Failed to encode configuration")?
    );

    DependencyChecker::system().verify(&standard_requirements())?;

    let descriptor = build(&config);
    descriptor
        .validate()
        .context("Pipeline description is inconsistent")?;
    let launch = to_launch_string(&descriptor).context("Failed to serialize pipeline")?;

    let mut supervisor = ProcessSupervisor::new(SupervisorConfig::for_configuration(&config));
    supervisor.start(&launch)?;

    let outcome = supervisor
        .run(shutdown_signal())
        .await
        .context("Pipeline stopped")?;
    tracing::info!("Pipeline shut down: {:?}", outcome);

    Ok(())
}

/// Resolves on Ctrl+C, SIGTERM or SIGHUP
///
/// The pipeline runs in its own process group, so a terminal hangup only
/// reaches the supervisor and must still end in the shutdown protocol.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = unix_signal(tokio::signal::unix::SignalKind::terminate(), "SIGTERM");

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    #[cfg(unix)]
    let hangup = unix_signal(tokio::signal::unix::SignalKind::hangup(), "SIGHUP");

    #[cfg(not(unix))]
    let hangup = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = hangup => {},
    }
}

#[cfg(unix)]
async fn unix_signal(kind: tokio::signal::unix::SignalKind, name: &str) {
    match tokio::signal::unix::signal(kind) {
        Ok(mut stream) => {
            stream.recv().await;
            tracing::info!("Received {}", name);
        }
        Err(e) => {
            tracing::error!("Failed to install {} handler: {}", name, e);
            std::future::pending::<()>().await;
        }
    }
}
