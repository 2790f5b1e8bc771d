//! Serialized collection format shared with the persistence layer.
//!
//! This module defines the wire representation of annotations: flat lists
//! of shapes, tracks and tags with attributes keyed by specification id.
//! The in-memory model in [`crate::annotations`] is built from it on import
//! and rendered back to it on export.
//!
//! # Example
//!
//! ```
//! use framelabel::format::{SerializedCollection, SerializedShape, ShapeType};
//!
//! let collection = SerializedCollection {
//!     shapes: vec![SerializedShape::new(
//!         ShapeType::Rectangle,
//!         0,
//!         1u64,
//!         vec![10.0, 20.0, 100.0, 200.0],
//!     )],
//!     ..Default::default()
//! };
//! assert!(!collection.is_empty());
//! ```

mod ids;
pub mod io_json;
mod model;

pub use ids::{AttributeId, ClientId, LabelId, ServerId};
pub use model::{
    ObjectType, SerializedAttribute, SerializedCollection, SerializedShape, SerializedTag,
    SerializedTrack, SerializedTrackedShape, ShapeType, Source,
};
