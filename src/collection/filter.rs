//! Rule filtering of annotation states.
//!
//! Rule evaluation belongs to the host application. The collection flattens
//! each state into a [`FilterRecord`] and asks an [`AnnotationsFilter`]
//! which ones pass.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::format::{ClientId, ObjectType, ServerId, ShapeType};

/// Flattened view of one object state, as seen by filter rules.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterRecord {
    pub client_id: ClientId,
    pub server_id: Option<ServerId>,
    pub label: String,
    pub object_type: ObjectType,
    pub shape_type: Option<ShapeType>,
    pub occluded: bool,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Attribute values keyed by attribute name.
    pub attr: BTreeMap<String, String>,
}

/// Evaluates filter rules over flattened records.
pub trait AnnotationsFilter {
    /// Returns the client ids of the records that satisfy `rules`.
    fn filter(&self, records: &[FilterRecord], rules: &[serde_json::Value]) -> Vec<ClientId>;
}

/// Lets every record through.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl AnnotationsFilter for AcceptAll {
    fn filter(&self, records: &[FilterRecord], _rules: &[serde_json::Value]) -> Vec<ClientId> {
        records.iter().map(|r| r.client_id).collect()
    }
}

/// Adapts a closure into a filter.
pub struct PredicateFilter<F>(pub F);

impl<F> AnnotationsFilter for PredicateFilter<F>
where
    F: Fn(&FilterRecord, &[serde_json::Value]) -> bool,
{
    fn filter(&self, records: &[FilterRecord], rules: &[serde_json::Value]) -> Vec<ClientId> {
        records
            .iter()
            .filter(|r| (self.0)(r, rules))
            .map(|r| r.client_id)
            .collect()
    }
}

/// True if any rule references the `width` or `height` variables, whose
/// values change between keyframes.
pub fn is_difficult(rules: &[serde_json::Value]) -> bool {
    fn walk(value: &serde_json::Value) -> bool {
        match value {
            serde_json::Value::Object(map) => map.iter().any(|(key, v)| {
                (key == "var" && matches!(v.as_str(), Some("width") | Some("height"))) || walk(v)
            }),
            serde_json::Value::Array(items) => items.iter().any(walk),
            _ => false,
        }
    }
    rules.iter().any(walk)
}
