//! Change-tracking projection of an annotation at one frame.
//!
//! An [`ObjectState`] is what callers read and edit. Setters only record the
//! requested value and mark it in the [`ChangeSet`]; nothing reaches the
//! stored annotation until the state is passed to
//! [`Collection::save`](crate::collection::Collection::save).

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::format::{AttributeId, ClientId, LabelId, ObjectType, ServerId, ShapeType, Source};

pub use crate::interpolation::KeyframesInfo;

/// Fields of an [`ObjectState`] modified since it was produced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub label: bool,
    pub attributes: BTreeSet<AttributeId>,
    pub points: bool,
    pub rotation: bool,
    pub occluded: bool,
    pub outside: bool,
    pub z_order: bool,
    pub keyframe: bool,
    pub lock: bool,
    pub hidden: bool,
    pub pinned: bool,
    pub color: bool,
    pub descriptions: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        *self == ChangeSet::default()
    }

    /// True if any field stored on a track keyframe changed.
    pub fn touches_position(&self) -> bool {
        self.points || self.rotation || self.occluded || self.outside || self.z_order
    }

    pub fn clear(&mut self) {
        *self = ChangeSet::default();
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObjectState {
    pub(crate) client_id: Option<ClientId>,
    pub(crate) server_id: Option<ServerId>,
    pub(crate) object_type: ObjectType,
    pub(crate) shape_type: Option<ShapeType>,
    pub(crate) frame: u32,
    pub(crate) label_id: LabelId,
    pub(crate) group: u32,
    pub(crate) source: Source,
    pub(crate) attributes: BTreeMap<AttributeId, String>,
    pub(crate) points: Vec<f64>,
    pub(crate) rotation: f64,
    pub(crate) occluded: bool,
    pub(crate) outside: bool,
    pub(crate) z_order: i32,
    pub(crate) keyframe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) keyframes: Option<KeyframesInfo>,
    pub(crate) lock: bool,
    pub(crate) hidden: bool,
    pub(crate) pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) color: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) descriptions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) elements: Vec<ObjectState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) parent_id: Option<ClientId>,
    pub(crate) updated: u64,
    #[serde(skip)]
    pub(crate) changes: ChangeSet,
}

impl ObjectState {
    fn blank(object_type: ObjectType, shape_type: Option<ShapeType>, frame: u32, label_id: LabelId) -> Self {
        Self {
            client_id: None,
            server_id: None,
            object_type,
            shape_type,
            frame,
            label_id,
            group: 0,
            source: Source::Manual,
            attributes: BTreeMap::new(),
            points: Vec::new(),
            rotation: 0.0,
            occluded: false,
            outside: false,
            z_order: 0,
            keyframe: object_type == ObjectType::Track,
            keyframes: None,
            lock: false,
            hidden: false,
            pinned: false,
            color: None,
            descriptions: Vec::new(),
            elements: Vec::new(),
            parent_id: None,
            updated: 0,
            changes: ChangeSet::default(),
        }
    }

    /// A new shape to be created with [`Collection::put`](crate::collection::Collection::put).
    pub fn shape(shape_type: ShapeType, frame: u32, label_id: impl Into<LabelId>, points: Vec<f64>) -> Self {
        let mut state = Self::blank(ObjectType::Shape, Some(shape_type), frame, label_id.into());
        state.points = points;
        state
    }

    /// A new track whose first keyframe is `frame`.
    pub fn track(shape_type: ShapeType, frame: u32, label_id: impl Into<LabelId>, points: Vec<f64>) -> Self {
        let mut state = Self::blank(ObjectType::Track, Some(shape_type), frame, label_id.into());
        state.points = points;
        state
    }

    pub fn tag(frame: u32, label_id: impl Into<LabelId>) -> Self {
        Self::blank(ObjectType::Tag, None, frame, label_id.into())
    }

    pub fn with_attribute(mut self, id: impl Into<AttributeId>, value: impl Into<String>) -> Self {
        self.attributes.insert(id.into(), value.into());
        self
    }

    pub fn with_occluded(mut self, occluded: bool) -> Self {
        self.occluded = occluded;
        self
    }

    pub fn with_z_order(mut self, z_order: i32) -> Self {
        self.z_order = z_order;
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_group(mut self, group: u32) -> Self {
        self.group = group;
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// Child states of a skeleton, one per sublabel.
    pub fn with_elements(mut self, elements: Vec<ObjectState>) -> Self {
        self.elements = elements;
        self
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn server_id(&self) -> Option<ServerId> {
        self.server_id
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn shape_type(&self) -> Option<ShapeType> {
        self.shape_type
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn label_id(&self) -> LabelId {
        self.label_id
    }

    pub fn group(&self) -> u32 {
        self.group
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn attributes(&self) -> &BTreeMap<AttributeId, String> {
        &self.attributes
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn occluded(&self) -> bool {
        self.occluded
    }

    pub fn outside(&self) -> bool {
        self.outside
    }

    pub fn z_order(&self) -> i32 {
        self.z_order
    }

    pub fn keyframe(&self) -> bool {
        self.keyframe
    }

    pub fn keyframes(&self) -> Option<KeyframesInfo> {
        self.keyframes
    }

    pub fn lock(&self) -> bool {
        self.lock
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn pinned(&self) -> bool {
        self.pinned
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    pub fn elements(&self) -> &[ObjectState] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [ObjectState] {
        &mut self.elements
    }

    pub fn parent_id(&self) -> Option<ClientId> {
        self.parent_id
    }

    pub fn updated(&self) -> u64 {
        self.updated
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn set_label(&mut self, label_id: impl Into<LabelId>) {
        self.label_id = label_id.into();
        self.changes.label = true;
    }

    pub fn set_attribute(&mut self, id: impl Into<AttributeId>, value: impl Into<String>) {
        let id = id.into();
        self.attributes.insert(id, value.into());
        self.changes.attributes.insert(id);
    }

    pub fn set_points(&mut self, points: Vec<f64>) {
        self.points = points;
        self.changes.points = true;
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        self.rotation = rotation;
        self.changes.rotation = true;
    }

    pub fn set_occluded(&mut self, occluded: bool) {
        self.occluded = occluded;
        self.changes.occluded = true;
    }

    pub fn set_outside(&mut self, outside: bool) {
        self.outside = outside;
        self.changes.outside = true;
    }

    pub fn set_z_order(&mut self, z_order: i32) {
        self.z_order = z_order;
        self.changes.z_order = true;
    }

    pub fn set_keyframe(&mut self, keyframe: bool) {
        self.keyframe = keyframe;
        self.changes.keyframe = true;
    }

    pub fn set_lock(&mut self, lock: bool) {
        self.lock = lock;
        self.changes.lock = true;
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
        self.changes.hidden = true;
    }

    pub fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
        self.changes.pinned = true;
    }

    /// Sets a `#rrggbb` display color.
    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = Some(color.into());
        self.changes.color = true;
    }

    pub fn set_descriptions(&mut self, descriptions: Vec<String>) {
        self.descriptions = descriptions;
        self.changes.descriptions = true;
    }
}
