//! End-to-end checks: options → descriptor → launch text

use dvsource_core::config::{AspectRatio, Options, RcFile, TestPattern, VideoStandard};
use dvsource_core::pipeline::{build, to_launch_args, to_launch_string};

fn launch_text(options: Options) -> String {
    let config = options.resolve(&RcFile::default()).unwrap();
    to_launch_string(&build(&config)).unwrap()
}

fn ntsc_four_three() -> Options {
    Options {
        standard: VideoStandard::Ntsc,
        aspect: AspectRatio::FourThree,
        host: Some("10.0.0.5".to_string()),
        port: Some("5000".to_string()),
        ..Default::default()
    }
}

const NTSC_VIDEO: &str = "v4l2src device=/dev/video0 ! decodebin \
! queue leaky=downstream max-size-buffers=1 \
! videoscale add-borders=1 ! video/x-raw,width=1024,height=768,pixel-aspect-ratio=(fraction)1/1 \
! videoscale ! video/x-raw,width=720,height=480,pixel-aspect-ratio=(fraction)8/9 \
! videorate ! video/x-raw,framerate=(fraction)30000/1001 \
! videoconvert ! video/x-raw,format=(string)Y41B";

const NETWORK: &str = "queue leaky=downstream max-size-buffers=1 \
! videoconvert ! avenc_dvvideo ! avmux_dv name=dvmux ! dvswitchsink host=10.0.0.5 port=5000";

const AUDIO: &str =
    "audiotestsrc is-live=true wave=sine freq=200 ! audio/x-raw,channels=2,rate=48000,depth=16 ! queue ! dvmux.";

#[test]
fn test_ntsc_four_three_launch_text() {
    assert_eq!(
        launch_text(ntsc_four_three()),
        format!("{NTSC_VIDEO} ! {NETWORK} {AUDIO}")
    );
}

#[test]
fn test_preview_launch_text() {
    let text = launch_text(Options {
        display: true,
        ..ntsc_four_three()
    });

    assert_eq!(
        text,
        format!(
            "{NTSC_VIDEO} ! tee name=t ! {NETWORK} \
             t. ! queue max-size-buffers=1 leaky=downstream ! videoconvert ! xvimagesink {AUDIO}"
        )
    );
}

#[test]
fn test_routing_id_tokens() {
    let without = to_launch_args(&launch_text(ntsc_four_three()));
    assert!(!without.iter().any(|t| t.starts_with("c3voc")));

    let with = to_launch_args(&launch_text(Options {
        c3voc: 7,
        ..ntsc_four_three()
    }));
    let sink = with.iter().position(|t| t == "dvswitchsink").unwrap();
    assert_eq!(
        &with[sink..sink + 5],
        ["dvswitchsink", "host=10.0.0.5", "port=5000", "c3voc-mode=1", "c3voc-source-id=7"]
    );
}

#[test]
fn test_pal_sixteen_nine_test_pattern() {
    let text = launch_text(Options {
        fake: Some(TestPattern::Ball),
        aspect: AspectRatio::SixteenNine,
        host: Some("mixer".to_string()),
        port: Some("1234".to_string()),
        ..Default::default()
    });

    assert!(text.starts_with(&format!(
        "videotestsrc is-live=true pattern={} ! queue",
        TestPattern::Ball.id()
    )));
    assert!(text.contains("width=1280,height=720"));
    assert!(text.contains("width=720,height=576,pixel-aspect-ratio=(fraction)64/45"));
    assert!(text.contains("framerate=(fraction)25/1"));
    assert!(!text.contains("v4l2src"));
}

#[test]
fn test_device_caps_follow_the_source() {
    let text = launch_text(Options {
        device: "/dev/video2".into(),
        caps: Some("image/jpeg,width=1280".to_string()),
        ..ntsc_four_three()
    });

    assert!(text.starts_with("v4l2src device=/dev/video2 ! image/jpeg,width=1280 ! decodebin ! "));
}

#[test]
fn test_launch_text_is_deterministic() {
    for standard in VideoStandard::ALL {
        for aspect in AspectRatio::ALL {
            for display in [false, true] {
                let options = Options {
                    standard,
                    aspect,
                    display,
                    ..ntsc_four_three()
                };
                assert_eq!(launch_text(options.clone()), launch_text(options));
            }
        }
    }
}
