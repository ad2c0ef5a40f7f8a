//! Configuration → pipeline descriptor

use super::graph::{Caps, PipelineDescriptor, Stage, StageId, StageKind};
use super::tables::{self, OUTPUT_PIXEL_FORMAT, RAW_AUDIO, RAW_VIDEO};
use crate::config::{Configuration, VideoSource};

/// Instance name of the preview branch point
pub const TEE_NAME: &str = "t";

/// Instance name of the muxer, referenced by the audio chain
pub const MUXER_NAME: &str = "dvmux";

/// Build the pipeline for a configuration
///
/// Pure: equal configurations always produce equal descriptors.
pub fn build(config: &Configuration) -> PipelineDescriptor {
    let mut desc = PipelineDescriptor::new();

    let mut video = source_stages(&mut desc, &config.source);
    let padded = tables::padded_geometry(config.aspect);
    let broadcast = tables::broadcast_geometry(config.standard, config.aspect);

    video.push(desc.add_stage(leaky_queue()));
    video.push(desc.add_stage(
        Stage::new(StageKind::FormatNormalizer, "videoscale")
            .with_property("add-borders", 1u32)
            .with_caps(padded.caps()),
    ));
    video.push(desc.add_stage(
        Stage::new(StageKind::FormatNormalizer, "videoscale").with_caps(broadcast.caps()),
    ));
    video.push(desc.add_stage(
        Stage::new(StageKind::RateNormalizer, "videorate")
            .with_caps(Caps::new(RAW_VIDEO).field("framerate", tables::frame_rate(config.standard))),
    ));
    video.push(desc.add_stage(
        Stage::new(StageKind::ColorConverter, "videoconvert")
            .with_caps(Caps::new(RAW_VIDEO).field("format", OUTPUT_PIXEL_FORMAT)),
    ));

    let tee = config
        .preview
        .then(|| desc.add_stage(Stage::new(StageKind::Branch, "tee").with_name(TEE_NAME)));
    video.extend(tee);
    desc.chain(&video);

    let mut sink = Stage::new(StageKind::NetworkSink, "dvswitchsink")
        .with_property("host", config.endpoint.host.as_str())
        .with_property("port", config.endpoint.port);
    if let Some(id) = config.routing_id {
        sink = sink
            .with_property("c3voc-mode", 1u32)
            .with_property("c3voc-source-id", id);
    }

    let muxer = Stage::new(StageKind::Muxer, "avmux_dv").with_name(MUXER_NAME);
    let network = [
        desc.add_stage(leaky_queue()),
        desc.add_stage(Stage::new(StageKind::ColorConverter, "videoconvert")),
        desc.add_stage(Stage::new(StageKind::Encoder, "avenc_dvvideo")),
        desc.add_stage(muxer),
        desc.add_stage(sink),
    ];
    let muxer = network[3];
    if let Some(&last) = video.last() {
        desc.link(last, network[0]);
    }
    desc.chain(&network);

    if let Some(tee) = tee {
        let preview = [
            desc.add_stage(
                Stage::new(StageKind::Queue, "queue")
                    .with_property("max-size-buffers", 1u32)
                    .with_property("leaky", "downstream"),
            ),
            desc.add_stage(Stage::new(StageKind::ColorConverter, "videoconvert")),
            desc.add_stage(Stage::new(StageKind::PreviewSink, "xvimagesink")),
        ];
        desc.link(tee, preview[0]);
        desc.chain(&preview);
    }

    let audio = [
        desc.add_stage(
            Stage::new(StageKind::Source, "audiotestsrc")
                .with_property("is-live", true)
                .with_property("wave", "sine")
                .with_property("freq", 200u32)
                .with_caps(
                    Caps::new(RAW_AUDIO)
                        .field("channels", config.audio.channels)
                        .field("rate", config.audio.rate)
                        .field("depth", config.audio.depth),
                ),
        ),
        desc.add_stage(Stage::new(StageKind::Queue, "queue")),
    ];
    desc.chain(&audio);
    desc.link(audio[1], muxer);

    desc.set_video_entry(video[0]);
    desc.set_audio_entry(audio[0]);
    desc
}

fn source_stages(desc: &mut PipelineDescriptor, source: &VideoSource) -> Vec<StageId> {
    match source {
        VideoSource::Device { path, caps } => {
            let mut device = Stage::new(StageKind::Source, "v4l2src")
                .with_property("device", path.display().to_string());
            if let Some(caps) = caps {
                device = device.with_caps(Caps::Raw(caps.clone()));
            }
            vec![
                desc.add_stage(device),
                desc.add_stage(Stage::new(StageKind::Decoder, "decodebin")),
            ]
        }
        VideoSource::TestPattern(pattern) => vec![desc.add_stage(
            Stage::new(StageKind::Source, "videotestsrc")
                .with_property("is-live", true)
                .with_property("pattern", pattern.id()),
        )],
    }
}

/// Queue holding at most one buffer, dropping old data when full
fn leaky_queue() -> Stage {
    Stage::new(StageKind::Queue, "queue")
        .with_property("leaky", "downstream")
        .with_property("max-size-buffers", 1u32)
}
