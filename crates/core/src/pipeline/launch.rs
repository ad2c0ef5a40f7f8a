//! Launch-syntax serialization
//!
//! Renders a [`PipelineDescriptor`] in the executor's textual pipeline
//! syntax:
//!
//! ```text
//! videotestsrc is-live=true pattern=0 ! queue ! tee name=t ! ... ! avmux_dv name=dvmux ! dvswitchsink ...
//!   t. ! queue ! ... ! xvimagesink audiotestsrc ... ! queue ! dvmux.
//! ```
//!
//! Traversal is depth-first from the video entry, then from the audio entry.
//! A stage with several outputs is followed edge by edge in link order, later
//! edges restarting from a `name.` reference. Reaching an already emitted
//! stage emits a `name.` reference and ends that chain.

use std::collections::HashSet;
use std::fmt::Write;

use super::graph::{Caps, Param, PipelineDescriptor, Stage, StageId, Value};
use crate::{Error, Result};

/// Serialize a descriptor; identical descriptors yield identical text
pub fn to_launch_string(desc: &PipelineDescriptor) -> Result<String> {
    let video = desc
        .video_entry()
        .ok_or_else(|| Error::InvalidDescriptor("no video entry stage".to_string()))?;

    let mut writer = Writer {
        desc,
        out: String::new(),
        emitted: HashSet::new(),
    };

    writer.walk(video)?;
    if let Some(audio) = desc.audio_entry() {
        writer.out.push(' ');
        writer.walk(audio)?;
    }

    Ok(writer.out)
}

/// Split launch text into the argument vector handed to the executor
pub fn to_launch_args(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

struct Writer<'a> {
    desc: &'a PipelineDescriptor,
    out: String,
    emitted: HashSet<StageId>,
}

impl Writer<'_> {
    fn walk(&mut self, id: StageId) -> Result<()> {
        let stage = self
            .desc
            .stage(id)
            .ok_or_else(|| Error::InvalidDescriptor(format!("stage {} does not exist", id.0)))?;

        if !self.emitted.insert(id) {
            let name = reference_name(stage)?;
            let _ = write!(self.out, "{}.", name);
            return Ok(());
        }

        render_stage(&mut self.out, stage);

        let outputs: Vec<StageId> = self.desc.outgoing(id).collect();
        for (index, next) in outputs.into_iter().enumerate() {
            if index == 0 {
                self.out.push_str(" ! ");
            } else {
                let name = reference_name(stage)?;
                let _ = write!(self.out, " {}. ! ", name);
            }
            self.walk(next)?;
        }

        Ok(())
    }
}

fn reference_name(stage: &Stage) -> Result<&str> {
    stage.name.as_deref().ok_or_else(|| {
        Error::InvalidDescriptor(format!("stage '{}' is referenced twice but has no name", stage.element))
    })
}

fn render_stage(out: &mut String, stage: &Stage) {
    out.push_str(&stage.element);
    if let Some(name) = &stage.name {
        let _ = write!(out, " name={}", name);
    }
    for Param { name, value } in &stage.properties {
        let _ = write!(out, " {}={}", name, property_value(value));
    }

    match &stage.caps {
        Some(Caps::Fields { media_type, fields }) => {
            let _ = write!(out, " ! {}", media_type);
            for Param { name, value } in fields {
                let _ = write!(out, ",{}={}", name, caps_value(value));
            }
        }
        Some(Caps::Raw(text)) => {
            let _ = write!(out, " ! {}", text.trim());
        }
        None => {}
    }
}

fn property_value(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Str(v) => v.clone(),
        Value::Fraction(v) => v.to_string(),
    }
}

/// Caps fields carry explicit types for anything that is not an integer
fn caps_value(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Bool(v) => format!("(boolean){}", v),
        Value::Str(v) => format!("(string){}", v),
        Value::Fraction(v) => format!("(fraction){}", v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::graph::{Fraction, StageKind};

    #[test]
    fn test_render_caps_types() {
        let mut out = String::new();
        render_stage(
            &mut out,
            &Stage::new(StageKind::FormatNormalizer, "videoscale")
                .with_property("add-borders", true)
                .with_caps(
                    Caps::new("video/x-raw")
                        .field("width", 720u32)
                        .field("pixel-aspect-ratio", Fraction::new(16, 15))
                        .field("format", "Y41B"),
                ),
        );
        assert_eq!(
            out,
            "videoscale add-borders=true ! video/x-raw,width=720,pixel-aspect-ratio=(fraction)16/15,format=(string)Y41B"
        );
    }

    #[test]
    fn test_branch_and_join_references() {
        let mut desc = PipelineDescriptor::new();
        let src = desc.add_stage(Stage::new(StageKind::Source, "videotestsrc"));
        let tee = desc.add_stage(Stage::new(StageKind::Branch, "tee").with_name("t"));
        let mux = desc.add_stage(Stage::new(StageKind::Muxer, "mux").with_name("m"));
        let sink = desc.add_stage(Stage::new(StageKind::NetworkSink, "fakesink"));
        let preview = desc.add_stage(Stage::new(StageKind::PreviewSink, "xvimagesink"));
        let audio = desc.add_stage(Stage::new(StageKind::Source, "audiotestsrc"));
        desc.chain(&[src, tee, mux, sink]);
        desc.link(tee, preview);
        desc.link(audio, mux);
        desc.set_video_entry(src);
        desc.set_audio_entry(audio);

        assert_eq!(
            to_launch_string(&desc).unwrap(),
            "videotestsrc ! tee name=t ! mux name=m ! fakesink t. ! xvimagesink audiotestsrc ! m."
        );
    }

    #[test]
    fn test_unnamed_join_is_an_error() {
        let mut desc = PipelineDescriptor::new();
        let a = desc.add_stage(Stage::new(StageKind::Source, "a"));
        let b = desc.add_stage(Stage::new(StageKind::Source, "b"));
        let mux = desc.add_stage(Stage::new(StageKind::Muxer, "mux"));
        desc.link(a, mux);
        desc.link(b, mux);
        desc.set_video_entry(a);
        desc.set_audio_entry(b);

        assert!(to_launch_string(&desc).is_err());
    }

    #[test]
    fn test_launch_args_split_on_whitespace() {
        assert_eq!(
            to_launch_args("queue  leaky=downstream ! fakesink\n"),
            vec!["queue", "leaky=downstream", "!", "fakesink"]
        );
    }
}
