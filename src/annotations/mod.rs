//! Annotation entities: shapes, tracks, tags and skeleton composites.
//!
//! An [`Annotation`] is the stored form of one object. Skeleton parents
//! reference their children by [`ClientId`] in `elements`, and each child
//! points back through `parent`; the children live in the same store as
//! every other object.

mod validate;

pub use validate::{check_points, check_shape_area, fit_points, MIN_SHAPE_AREA, MIN_SHAPE_LENGTH};

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::format::{AttributeId, ClientId, LabelId, ObjectType, ServerId, ShapeType, Source};

/// Geometry and visibility of a shape at one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Position {
    pub points: Vec<f64>,
    pub occluded: bool,
    pub outside: bool,
    pub rotation: f64,
    pub z_order: i32,
}

/// One keyframe of a track.
///
/// `attributes` holds only the mutable attribute values set at this
/// keyframe; values carry forward until the next keyframe overrides them.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrackedShape {
    pub server_id: Option<ServerId>,
    pub position: Position,
    pub attributes: BTreeMap<AttributeId, String>,
}

impl TrackedShape {
    pub fn new(position: Position) -> Self {
        Self {
            server_id: None,
            position,
            attributes: BTreeMap::new(),
        }
    }
}

/// Keyframes of a track, ordered by frame.
pub type Keyframes = BTreeMap<u32, TrackedShape>;

/// What kind of object an annotation is, with its kind-specific data.
#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationKind {
    Shape(Position),
    Track(Keyframes),
    Tag,
}

/// A stored annotation object.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub client_id: ClientId,
    pub server_id: Option<ServerId>,
    pub label_id: LabelId,
    /// Anchor frame for shapes and tags; first keyframe for tracks.
    pub frame: u32,
    pub group: u32,
    pub source: Source,
    /// `None` for tags.
    pub shape_type: Option<ShapeType>,
    /// All attributes for shapes and tags; immutable ones for tracks.
    pub attributes: BTreeMap<AttributeId, String>,
    pub kind: AnnotationKind,
    pub removed: bool,
    pub lock: bool,
    pub hidden: bool,
    pub pinned: bool,
    pub color: Option<String>,
    pub descriptions: Vec<String>,
    /// Milliseconds since the Unix epoch of the last change.
    pub updated: u64,
    pub elements: Vec<ClientId>,
    pub parent: Option<ClientId>,
}

/// Current wall-clock time in milliseconds.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl Annotation {
    fn base(client_id: ClientId, label_id: LabelId, frame: u32, kind: AnnotationKind) -> Self {
        Self {
            client_id,
            server_id: None,
            label_id,
            frame,
            group: 0,
            source: Source::Manual,
            shape_type: None,
            attributes: BTreeMap::new(),
            kind,
            removed: false,
            lock: false,
            hidden: false,
            pinned: false,
            color: None,
            descriptions: Vec::new(),
            updated: now_millis(),
            elements: Vec::new(),
            parent: None,
        }
    }

    pub fn new_shape(
        client_id: ClientId,
        label_id: LabelId,
        frame: u32,
        shape_type: ShapeType,
        position: Position,
    ) -> Self {
        let mut annotation = Self::base(client_id, label_id, frame, AnnotationKind::Shape(position));
        annotation.shape_type = Some(shape_type);
        annotation
    }

    /// Creates a track; `frame` is taken from the first keyframe.
    pub fn new_track(
        client_id: ClientId,
        label_id: LabelId,
        shape_type: ShapeType,
        keyframes: Keyframes,
    ) -> Self {
        let frame = keyframes.keys().next().copied().unwrap_or_default();
        let mut annotation = Self::base(client_id, label_id, frame, AnnotationKind::Track(keyframes));
        annotation.shape_type = Some(shape_type);
        annotation
    }

    pub fn new_tag(client_id: ClientId, label_id: LabelId, frame: u32) -> Self {
        Self::base(client_id, label_id, frame, AnnotationKind::Tag)
    }

    pub fn object_type(&self) -> ObjectType {
        match self.kind {
            AnnotationKind::Shape(_) => ObjectType::Shape,
            AnnotationKind::Track(_) => ObjectType::Track,
            AnnotationKind::Tag => ObjectType::Tag,
        }
    }

    pub fn is_skeleton(&self) -> bool {
        self.shape_type == Some(ShapeType::Skeleton)
    }

    pub fn keyframes(&self) -> Option<&Keyframes> {
        match &self.kind {
            AnnotationKind::Track(keyframes) => Some(keyframes),
            _ => None,
        }
    }

    pub fn keyframes_mut(&mut self) -> Option<&mut Keyframes> {
        match &mut self.kind {
            AnnotationKind::Track(keyframes) => Some(keyframes),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        match &self.kind {
            AnnotationKind::Shape(position) => Some(position),
            _ => None,
        }
    }

    pub fn position_mut(&mut self) -> Option<&mut Position> {
        match &mut self.kind {
            AnnotationKind::Shape(position) => Some(position),
            _ => None,
        }
    }

    /// Re-derives the anchor frame of a track from its first keyframe.
    pub fn sync_track_frame(&mut self) {
        if let Some(first) = self.keyframes().and_then(|k| k.keys().next().copied()) {
            self.frame = first;
        }
    }

    pub fn touch(&mut self) {
        self.updated = now_millis();
    }
}

/// Resolves attribute values of an object at a frame.
pub trait Attributable {
    fn attributes_at(&self, frame: u32) -> BTreeMap<AttributeId, String>;
}

impl Attributable for Annotation {
    fn attributes_at(&self, frame: u32) -> BTreeMap<AttributeId, String> {
        let mut values = self.attributes.clone();
        if let Some(keyframes) = self.keyframes() {
            // values set before the first keyframe still apply to frames ahead of it
            let first = keyframes.keys().next().copied().unwrap_or_default();
            for (_, shape) in keyframes.range(..=frame.max(first)) {
                values.extend(shape.attributes.iter().map(|(k, v)| (*k, v.clone())));
            }
        }
        values
    }
}
