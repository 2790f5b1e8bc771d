//! Serialized collection model exchanged with the persistence layer.
//!
//! A collection is exported as three flat lists (`shapes`, `tracks`,
//! `tags`). Tracks carry their keyframes as an ordered `shapes` list;
//! skeletons carry their children in `elements`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AttributeId, ClientId, LabelId, ServerId};

/// Geometry kind of a shape or track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Rectangle,
    Polygon,
    Polyline,
    Points,
    Ellipse,
    Cuboid,
    Mask,
    Skeleton,
}

impl ShapeType {
    /// All geometry kinds, in the order used by statistics reports.
    pub const ALL: [ShapeType; 8] = [
        ShapeType::Rectangle,
        ShapeType::Polygon,
        ShapeType::Polyline,
        ShapeType::Points,
        ShapeType::Ellipse,
        ShapeType::Cuboid,
        ShapeType::Mask,
        ShapeType::Skeleton,
    ];

    /// Returns the lowercase name used in the serialized format.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeType::Rectangle => "rectangle",
            ShapeType::Polygon => "polygon",
            ShapeType::Polyline => "polyline",
            ShapeType::Points => "points",
            ShapeType::Ellipse => "ellipse",
            ShapeType::Cuboid => "cuboid",
            ShapeType::Mask => "mask",
            ShapeType::Skeleton => "skeleton",
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of an annotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    #[default]
    Manual,
    Auto,
    SemiAuto,
    File,
    Consensus,
    GroundTruth,
}

/// Kind of annotation object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Shape,
    Track,
    Tag,
}

/// A single attribute value as stored in the serialized format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedAttribute {
    pub spec_id: AttributeId,
    pub value: String,
}

impl SerializedAttribute {
    pub fn new(spec_id: impl Into<AttributeId>, value: impl Into<String>) -> Self {
        Self {
            spec_id: spec_id.into(),
            value: value.into(),
        }
    }
}

/// The complete serialized annotation set of a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedCollection {
    #[serde(default)]
    pub shapes: Vec<SerializedShape>,

    #[serde(default)]
    pub tracks: Vec<SerializedTrack>,

    #[serde(default)]
    pub tags: Vec<SerializedTag>,
}

impl SerializedCollection {
    /// Returns true if the collection holds no annotations at all.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.tracks.is_empty() && self.tags.is_empty()
    }
}

/// A shape anchored at a single frame.
///
/// Mask points end with `[left, top, right, bottom]`; skeleton points are
/// empty and the children live in `elements`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedShape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ServerId>,

    #[serde(rename = "clientID", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,

    #[serde(rename = "type")]
    pub shape_type: ShapeType,

    pub frame: u32,

    pub label_id: LabelId,

    #[serde(default)]
    pub group: u32,

    #[serde(default)]
    pub source: Source,

    #[serde(default)]
    pub occluded: bool,

    #[serde(default)]
    pub outside: bool,

    #[serde(default)]
    pub z_order: i32,

    #[serde(default)]
    pub rotation: f64,

    #[serde(default)]
    pub points: Vec<f64>,

    #[serde(default)]
    pub attributes: Vec<SerializedAttribute>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<SerializedShape>,
}

impl SerializedShape {
    /// Creates a manual, ungrouped shape with no attributes.
    pub fn new(
        shape_type: ShapeType,
        frame: u32,
        label_id: impl Into<LabelId>,
        points: Vec<f64>,
    ) -> Self {
        Self {
            id: None,
            client_id: None,
            shape_type,
            frame,
            label_id: label_id.into(),
            group: 0,
            source: Source::Manual,
            occluded: false,
            outside: false,
            z_order: 0,
            rotation: 0.0,
            points,
            attributes: Vec::new(),
            elements: Vec::new(),
        }
    }
}

/// One keyframe of a serialized track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedTrackedShape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ServerId>,

    pub frame: u32,

    #[serde(rename = "type")]
    pub shape_type: ShapeType,

    #[serde(default)]
    pub occluded: bool,

    #[serde(default)]
    pub outside: bool,

    #[serde(default)]
    pub z_order: i32,

    #[serde(default)]
    pub rotation: f64,

    #[serde(default)]
    pub points: Vec<f64>,

    #[serde(default)]
    pub attributes: Vec<SerializedAttribute>,
}

impl SerializedTrackedShape {
    /// Creates a visible keyframe with no attributes.
    pub fn new(shape_type: ShapeType, frame: u32, points: Vec<f64>) -> Self {
        Self {
            id: None,
            frame,
            shape_type,
            occluded: false,
            outside: false,
            z_order: 0,
            rotation: 0.0,
            points,
            attributes: Vec::new(),
        }
    }
}

/// A track: an object followed across frames through its keyframes.
///
/// Immutable attributes live on the track; mutable ones on each keyframe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedTrack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ServerId>,

    #[serde(rename = "clientID", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,

    pub frame: u32,

    pub label_id: LabelId,

    #[serde(default)]
    pub group: u32,

    #[serde(default)]
    pub source: Source,

    #[serde(default)]
    pub attributes: Vec<SerializedAttribute>,

    #[serde(default)]
    pub shapes: Vec<SerializedTrackedShape>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<SerializedTrack>,
}

impl SerializedTrack {
    /// Creates a manual, ungrouped track from its keyframes.
    pub fn new(
        frame: u32,
        label_id: impl Into<LabelId>,
        shapes: Vec<SerializedTrackedShape>,
    ) -> Self {
        Self {
            id: None,
            client_id: None,
            frame,
            label_id: label_id.into(),
            group: 0,
            source: Source::Manual,
            attributes: Vec::new(),
            shapes,
            elements: Vec::new(),
        }
    }
}

/// A frame-level label without geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ServerId>,

    #[serde(rename = "clientID", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,

    pub frame: u32,

    pub label_id: LabelId,

    #[serde(default)]
    pub group: u32,

    #[serde(default)]
    pub source: Source,

    #[serde(default)]
    pub attributes: Vec<SerializedAttribute>,
}

impl SerializedTag {
    pub fn new(frame: u32, label_id: impl Into<LabelId>) -> Self {
        Self {
            id: None,
            client_id: None,
            frame,
            label_id: label_id.into(),
            group: 0,
            source: Source::Manual,
            attributes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_type_serde_names() {
        let json = serde_json::to_string(&ShapeType::Polyline).unwrap();
        assert_eq!(json, "\"polyline\"");
        let parsed: ShapeType = serde_json::from_str("\"cuboid\"").unwrap();
        assert_eq!(parsed, ShapeType::Cuboid);
    }

    #[test]
    fn test_source_serde_names() {
        let json = serde_json::to_string(&Source::SemiAuto).unwrap();
        assert_eq!(json, "\"semi-auto\"");
        let parsed: Source = serde_json::from_str("\"ground-truth\"").unwrap();
        assert_eq!(parsed, Source::GroundTruth);
    }

    #[test]
    fn test_shape_defaults_when_fields_missing() {
        let json = r#"{"type": "rectangle", "frame": 3, "label_id": 1, "points": [0, 0, 10, 10]}"#;
        let shape: SerializedShape = serde_json::from_str(json).unwrap();
        assert_eq!(shape.group, 0);
        assert_eq!(shape.source, Source::Manual);
        assert!(!shape.occluded);
        assert!(shape.attributes.is_empty());
        assert!(shape.client_id.is_none());
    }

    #[test]
    fn test_client_id_uses_camel_case_key() {
        let mut tag = SerializedTag::new(0, 1u64);
        tag.client_id = Some(ClientId(42));
        let json = serde_json::to_string(&tag).unwrap();
        assert!(json.contains("\"clientID\":42"));
    }
}
