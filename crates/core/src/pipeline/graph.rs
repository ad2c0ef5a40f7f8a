//! Pipeline stage graph
//!
//! A [`PipelineDescriptor`] is an acyclic graph of [`Stage`]s. The video side
//! starts at `video_entry` and may fork at a branch stage; the audio side
//! starts at `audio_entry` and joins the video side at the muxer.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::{Error, Result};

/// Index of a stage within its descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageId(pub usize);

/// Role a stage plays in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Produces video or audio
    Source,
    /// Decodes whatever the capture device emits
    Decoder,
    /// Buffering point between threads
    Queue,
    /// Scales and pads to a target geometry
    FormatNormalizer,
    /// Drops/duplicates frames to a target rate
    RateNormalizer,
    /// Converts color space / pixel format
    ColorConverter,
    /// Duplicates its input to several outputs
    Branch,
    /// Compresses video
    Encoder,
    /// Interleaves audio and video
    Muxer,
    /// Sends the muxed stream to the mixer
    NetworkSink,
    /// Shows the video locally
    PreviewSink,
}

/// Exact rational number, used for frame rates and pixel aspect ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    /// Numerator
    pub num: u32,
    /// Denominator
    pub den: u32,
}

impl Fraction {
    /// Create a fraction without reducing it
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Value of a property or caps field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Integer
    Int(i64),
    /// Boolean
    Bool(bool),
    /// String or enum nick
    Str(String),
    /// Rational
    Fraction(Fraction),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Fraction> for Value {
    fn from(v: Fraction) -> Self {
        Value::Fraction(v)
    }
}

/// Named parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Parameter value
    pub value: Value,
}

/// Constraint on a stage's output format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Caps {
    /// Media type plus ordered fields
    Fields {
        /// Media type, e.g. `video/x-raw`
        media_type: String,
        /// Constrained fields
        fields: Vec<Param>,
    },
    /// Caps text supplied by the operator, passed through untouched
    Raw(String),
}

impl Caps {
    /// Start a structured caps value
    pub fn new(media_type: impl Into<String>) -> Self {
        Caps::Fields {
            media_type: media_type.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field; no-op on raw caps
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Caps::Fields { fields, .. } = &mut self {
            fields.push(Param {
                name: name.into(),
                value: value.into(),
            });
        }
        self
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Caps::Fields { fields, .. } => fields.iter().find(|p| p.name == name).map(|p| &p.value),
            Caps::Raw(_) => None,
        }
    }
}

/// One processing step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Role of the stage
    pub kind: StageKind,

    /// Executor element that implements it
    pub element: String,

    /// Instance name; required for branch and join points
    #[serde(default)]
    pub name: Option<String>,

    /// Element properties in emission order
    #[serde(default)]
    pub properties: Vec<Param>,

    /// Output caps, if constrained
    #[serde(default)]
    pub caps: Option<Caps>,
}

impl Stage {
    /// Create a stage with no properties
    pub fn new(kind: StageKind, element: impl Into<String>) -> Self {
        Self {
            kind,
            element: element.into(),
            name: None,
            properties: Vec::new(),
            caps: None,
        }
    }

    /// Give the stage an instance name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.push(Param {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Constrain the output caps
    pub fn with_caps(mut self, caps: Caps) -> Self {
        self.caps = Some(caps);
        self
    }

    /// Look up a property by name
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Look up an output caps field by name
    pub fn caps_field(&self, name: &str) -> Option<&Value> {
        self.caps.as_ref().and_then(|c| c.get(name))
    }
}

/// Directed edge between two stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Upstream stage
    pub from: StageId,
    /// Downstream stage
    pub to: StageId,
}

/// Structured, serializable description of a whole pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    stages: Vec<Stage>,
    edges: Vec<Edge>,
    video_entry: Option<StageId>,
    audio_entry: Option<StageId>,
}

impl PipelineDescriptor {
    /// Create an empty descriptor
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stage and return its id
    pub fn add_stage(&mut self, stage: Stage) -> StageId {
        self.stages.push(stage);
        StageId(self.stages.len() - 1)
    }

    /// Add an edge from `from` to `to`
    ///
    /// Edge order out of a stage is significant: the first edge of a branch
    /// stage is its main output.
    pub fn link(&mut self, from: StageId, to: StageId) {
        self.edges.push(Edge { from, to });
    }

    /// Link each stage to the next
    pub fn chain(&mut self, ids: &[StageId]) {
        for pair in ids.windows(2) {
            self.link(pair[0], pair[1]);
        }
    }

    /// Mark the first stage of the video chain
    pub fn set_video_entry(&mut self, id: StageId) {
        self.video_entry = Some(id);
    }

    /// Mark the first stage of the audio chain
    pub fn set_audio_entry(&mut self, id: StageId) {
        self.audio_entry = Some(id);
    }

    /// First stage of the video chain
    pub fn video_entry(&self) -> Option<StageId> {
        self.video_entry
    }

    /// First stage of the audio chain
    pub fn audio_entry(&self) -> Option<StageId> {
        self.audio_entry
    }

    /// Get a stage by id
    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.get(id.0)
    }

    /// All stages in insertion order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// All edges in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Downstream neighbours of a stage, in link order
    pub fn outgoing(&self, id: StageId) -> impl Iterator<Item = StageId> + '_ {
        self.edges.iter().filter(move |e| e.from == id).map(|e| e.to)
    }

    /// Number of edges entering a stage
    pub fn incoming_count(&self, id: StageId) -> usize {
        self.edges.iter().filter(|e| e.to == id).count()
    }

    /// First stage of the given kind
    pub fn find(&self, kind: StageKind) -> Option<&Stage> {
        self.stages.iter().find(|s| s.kind == kind)
    }

    /// Every stage of the given kind, in insertion order
    pub fn find_all(&self, kind: StageKind) -> Vec<&Stage> {
        self.stages.iter().filter(|s| s.kind == kind).collect()
    }

    /// Check the descriptor can be serialized unambiguously
    pub fn validate(&self) -> Result<()> {
        let video = self
            .video_entry
            .ok_or_else(|| Error::InvalidDescriptor("no video entry stage".to_string()))?;

        for entry in std::iter::once(video).chain(self.audio_entry) {
            if self.stage(entry).is_none() {
                return Err(Error::InvalidDescriptor(format!("entry stage {} does not exist", entry.0)));
            }
            if self.incoming_count(entry) > 0 {
                return Err(Error::InvalidDescriptor(format!(
                    "entry stage {} has incoming edges",
                    entry.0
                )));
            }
        }

        for edge in &self.edges {
            if self.stage(edge.from).is_none() || self.stage(edge.to).is_none() {
                return Err(Error::InvalidDescriptor(format!(
                    "edge {} -> {} refers to a missing stage",
                    edge.from.0, edge.to.0
                )));
            }
        }

        if let Some(cycle) = self.detect_cycle() {
            let path: Vec<String> = cycle.iter().map(|id| self.stages[id.0].element.clone()).collect();
            return Err(Error::InvalidDescriptor(format!("cycle detected: {}", path.join(" -> "))));
        }

        for (index, stage) in self.stages.iter().enumerate() {
            let id = StageId(index);
            let fans_out = self.outgoing(id).count() > 1;
            let joins = self.incoming_count(id) > 1;
            if (fans_out || joins) && stage.name.is_none() {
                return Err(Error::InvalidDescriptor(format!(
                    "{} stage '{}' must be named",
                    if fans_out { "branch" } else { "join" },
                    stage.element
                )));
            }
        }

        Ok(())
    }

    fn detect_cycle(&self) -> Option<Vec<StageId>> {
        let mut done = HashSet::new();

        for start in 0..self.stages.len() {
            let mut path = Vec::new();
            let mut on_path = HashSet::new();
            if self.cycle_from(StageId(start), &mut done, &mut on_path, &mut path) {
                return Some(path);
            }
        }

        None
    }

    fn cycle_from(
        &self,
        id: StageId,
        done: &mut HashSet<StageId>,
        on_path: &mut HashSet<StageId>,
        path: &mut Vec<StageId>,
    ) -> bool {
        if on_path.contains(&id) {
            path.push(id);
            return true;
        }
        if done.contains(&id) {
            return false;
        }

        on_path.insert(id);
        path.push(id);
        for next in self.outgoing(id).collect::<Vec<_>>() {
            if self.cycle_from(next, done, on_path, path) {
                return true;
            }
        }
        path.pop();
        on_path.remove(&id);
        done.insert(id);

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(n: usize) -> (PipelineDescriptor, Vec<StageId>) {
        let mut desc = PipelineDescriptor::new();
        let ids: Vec<StageId> = (0..n)
            .map(|i| desc.add_stage(Stage::new(StageKind::Queue, format!("q{}", i))))
            .collect();
        desc.chain(&ids);
        desc.set_video_entry(ids[0]);
        (desc, ids)
    }

    #[test]
    fn test_linear_graph_is_valid() {
        let (desc, ids) = linear(3);
        assert!(desc.validate().is_ok());
        assert_eq!(desc.outgoing(ids[0]).collect::<Vec<_>>(), vec![ids[1]]);
        assert_eq!(desc.incoming_count(ids[2]), 1);
    }

    #[test]
    fn test_cycle_detected() {
        let (mut desc, ids) = linear(3);
        desc.link(ids[2], ids[1]);
        let err = desc.validate().unwrap_err();
        assert!(err.to_string().contains("cycle"), "{}", err);
    }

    #[test]
    fn test_unnamed_branch_rejected() {
        let (mut desc, ids) = linear(3);
        let extra = desc.add_stage(Stage::new(StageKind::PreviewSink, "xvimagesink"));
        desc.link(ids[0], extra);
        let err = desc.validate().unwrap_err();
        assert!(err.to_string().contains("branch stage 'q0' must be named"), "{}", err);
    }

    #[test]
    fn test_missing_entry_rejected() {
        let desc = PipelineDescriptor::new();
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_caps_lookup() {
        let stage = Stage::new(StageKind::RateNormalizer, "videorate")
            .with_caps(Caps::new("video/x-raw").field("framerate", Fraction::new(25, 1)));
        assert_eq!(stage.caps_field("framerate"), Some(&Value::Fraction(Fraction::new(25, 1))));
        assert_eq!(stage.caps_field("width"), None);

        let raw = Caps::Raw("image/jpeg".into()).field("width", 640u32);
        assert_eq!(raw, Caps::Raw("image/jpeg".into()));
    }
}
