//! Label and attribute definitions consumed by the annotation model.
//!
//! The schema itself is owned by the surrounding application; this module
//! only describes its shape and the validation rules attached to it.

mod meta;

pub use meta::{FrameMeta, FrameSize, TaskMeta};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::format::{AttributeId, LabelId, ShapeType};

/// Which annotation kinds a label may be used for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelType {
    #[default]
    Any,
    Rectangle,
    Polygon,
    Polyline,
    Points,
    Ellipse,
    Cuboid,
    Mask,
    Skeleton,
    Tag,
}

/// UI input kind of an attribute, which also determines its value domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Select,
    Radio,
    Checkbox,
    Number,
    Text,
}

/// An attribute specification attached to a label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub id: AttributeId,
    pub name: String,
    pub input_type: InputType,

    /// Mutable attributes may change per keyframe of a track.
    #[serde(default)]
    pub mutable: bool,

    /// Allowed values. For numbers this is `[min, max, step]`.
    #[serde(default)]
    pub values: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl AttributeSpec {
    /// Returns true if `value` lies in this attribute's domain.
    pub fn validate(&self, value: &str) -> bool {
        match self.input_type {
            InputType::Text => true,
            InputType::Checkbox => matches!(value.to_ascii_lowercase().as_str(), "true" | "false"),
            InputType::Number => {
                let bounds: Vec<f64> = self.values.iter().filter_map(|v| v.trim().parse().ok()).collect();
                let Ok(number) = value.trim().parse::<f64>() else {
                    return false;
                };
                if !number.is_finite() {
                    return false;
                }
                match bounds.as_slice() {
                    [min, max, step, ..] => {
                        if number < *min || number > *max {
                            return false;
                        }
                        if *step <= 0.0 {
                            return true;
                        }
                        let steps = (number - min) / step;
                        (steps - steps.round()).abs() < 1e-9
                    }
                    [min, max] => number >= *min && number <= *max,
                    _ => true,
                }
            }
            InputType::Select | InputType::Radio => self.values.iter().any(|v| v == value),
        }
    }

    /// The value a freshly created object gets for this attribute.
    pub fn default_value(&self) -> String {
        if let Some(default) = &self.default_value {
            return default.clone();
        }
        match self.input_type {
            InputType::Checkbox => self.values.first().cloned().unwrap_or_else(|| "false".to_string()),
            _ => self.values.first().cloned().unwrap_or_default(),
        }
    }
}

/// A label definition. Skeleton labels carry one sublabel per element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,

    #[serde(rename = "type", default)]
    pub label_type: LabelType,

    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sublabels: Vec<Label>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Label {
    pub fn new(id: impl Into<LabelId>, name: impl Into<String>, label_type: LabelType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            label_type,
            attributes: Vec::new(),
            sublabels: Vec::new(),
            color: None,
        }
    }

    pub fn with_attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    pub fn with_sublabel(mut self, sublabel: Label) -> Self {
        self.sublabels.push(sublabel);
        self
    }

    pub fn attribute(&self, id: AttributeId) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.id == id)
    }

    pub fn attribute_by_name(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Whether this label may annotate an object of the given geometry.
    /// `None` stands for a tag.
    pub fn accepts(&self, shape_type: Option<ShapeType>) -> bool {
        match (self.label_type, shape_type) {
            (LabelType::Any, _) => true,
            (LabelType::Tag, None) => true,
            (_, None) => false,
            (LabelType::Rectangle, Some(ShapeType::Rectangle))
            | (LabelType::Polygon, Some(ShapeType::Polygon))
            | (LabelType::Polyline, Some(ShapeType::Polyline))
            | (LabelType::Points, Some(ShapeType::Points))
            | (LabelType::Ellipse, Some(ShapeType::Ellipse))
            | (LabelType::Cuboid, Some(ShapeType::Cuboid))
            | (LabelType::Mask, Some(ShapeType::Mask))
            | (LabelType::Skeleton, Some(ShapeType::Skeleton)) => true,
            _ => false,
        }
    }

    /// Default values for every attribute of this label.
    pub fn default_attributes(&self) -> BTreeMap<AttributeId, String> {
        self.attributes
            .iter()
            .map(|a| (a.id, a.default_value()))
            .collect()
    }
}

/// Indexed view over labels and their skeleton sublabels.
#[derive(Clone, Debug, Default)]
pub struct LabelSchema {
    roots: Vec<LabelId>,
    labels: BTreeMap<LabelId, Label>,
    parents: BTreeMap<LabelId, LabelId>,
}

impl LabelSchema {
    pub fn new(labels: Vec<Label>) -> Self {
        let mut schema = Self::default();
        for label in labels {
            schema.roots.push(label.id);
            schema.insert(label, None);
        }
        schema
    }

    fn insert(&mut self, label: Label, parent: Option<LabelId>) {
        if let Some(parent) = parent {
            self.parents.insert(label.id, parent);
        }
        for sublabel in &label.sublabels {
            self.insert(sublabel.clone(), Some(label.id));
        }
        self.labels.insert(label.id, label);
    }

    pub fn label(&self, id: LabelId) -> Option<&Label> {
        self.labels.get(&id)
    }

    /// The skeleton label owning a sublabel, if any.
    pub fn parent_of(&self, id: LabelId) -> Option<&Label> {
        self.parents.get(&id).and_then(|p| self.labels.get(p))
    }

    /// Top-level labels in definition order.
    pub fn roots(&self) -> impl Iterator<Item = &Label> {
        self.roots.iter().filter_map(|id| self.labels.get(id))
    }

    /// Finds the attribute specification with `id` under `label`.
    pub fn attribute(&self, label: LabelId, id: AttributeId) -> Option<&AttributeSpec> {
        self.label(label).and_then(|l| l.attribute(id))
    }
}
