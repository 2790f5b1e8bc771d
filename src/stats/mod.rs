//! Annotation statistics.
//!
//! This module counts objects per label and geometry, and splits drawn
//! instances from the ones filled in by interpolation.

mod report;

pub use report::{LabelStatistics, ShapeTrackCount, Statistics};

use std::collections::BTreeMap;

use crate::collection::Collection;
use crate::format::{
    LabelId, SerializedCollection, SerializedShape, SerializedTrack, SerializedTrackedShape,
    ShapeType,
};
use crate::schema::{FrameMeta, Label, LabelSchema};

/// Separator between a skeleton label and its sublabel in report keys.
pub const SUBLABEL_SEPARATOR: &str = "::";

/// Options for annotation statistics.
#[derive(Clone, Debug)]
pub struct StatsOptions {
    /// Width of histogram bars (in characters).
    pub bar_width: usize,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self { bar_width: 20 }
    }
}

impl Collection {
    /// Statistics over the live objects of the collection.
    pub fn statistics(&self) -> Statistics {
        stats_collection(&self.export(), self.schema(), self.meta(), &StatsOptions::default())
    }
}

/// Compute statistics for serialized annotations.
///
/// Every label of `schema` gets an entry, including unused ones. Objects
/// whose label is unknown to the schema are skipped.
pub fn stats_collection(
    data: &SerializedCollection,
    schema: &LabelSchema,
    meta: &dyn FrameMeta,
    opts: &StatsOptions,
) -> Statistics {
    let keys = label_keys(schema);
    let mut tally = Tally {
        labels: keys
            .values()
            .map(|key| (key.clone(), LabelStatistics::default()))
            .collect(),
        keys: &keys,
        meta,
    };

    for shape in &data.shapes {
        tally.shape(shape);
    }
    for track in &data.tracks {
        tally.track(track);
    }
    for tag in &data.tags {
        let deleted = meta.is_deleted(tag.frame);
        if let Some(stats) = tally.entry(tag.label_id) {
            stats.tag += 1;
            if !deleted {
                stats.manually += 1;
                stats.total += 1;
            }
        }
    }

    let labels = tally.labels;
    let mut total = LabelStatistics::default();
    for label in schema.roots() {
        if let Some(stats) = keys.get(&label.id).and_then(|key| labels.get(key)) {
            total.absorb(stats);
        }
    }

    tracing::debug!(
        labels = labels.len(),
        manually = total.manually,
        interpolated = total.interpolated,
        "Statistics computed"
    );

    Statistics {
        labels,
        total,
        bar_width: opts.bar_width,
    }
}

/// Report keys for every label; sublabels are namespaced by their skeleton.
fn label_keys(schema: &LabelSchema) -> BTreeMap<LabelId, String> {
    fn visit(label: &Label, prefix: Option<&str>, keys: &mut BTreeMap<LabelId, String>) {
        let key = match prefix {
            Some(parent) => format!("{}{}{}", parent, SUBLABEL_SEPARATOR, label.name),
            None => label.name.clone(),
        };
        for sublabel in &label.sublabels {
            visit(sublabel, Some(&key), keys);
        }
        keys.insert(label.id, key);
    }

    let mut keys = BTreeMap::new();
    for label in schema.roots() {
        visit(label, None, &mut keys);
    }
    keys
}

struct Tally<'a> {
    labels: BTreeMap<String, LabelStatistics>,
    keys: &'a BTreeMap<LabelId, String>,
    meta: &'a dyn FrameMeta,
}

impl Tally<'_> {
    fn entry(&mut self, label_id: LabelId) -> Option<&mut LabelStatistics> {
        let key = self.keys.get(&label_id)?;
        self.labels.get_mut(key)
    }

    fn shape(&mut self, shape: &SerializedShape) {
        let deleted = self.meta.is_deleted(shape.frame);
        if let Some(stats) = self.entry(shape.label_id) {
            stats.count(shape.shape_type).shape += 1;
            if !deleted {
                stats.manually += 1;
                stats.total += 1;
            }
        }
        for element in &shape.elements {
            self.shape(element);
        }
    }

    fn track(&mut self, track: &SerializedTrack) {
        let shape_type = if track.elements.is_empty() {
            track.shapes.first().map(|s| s.shape_type)
        } else {
            Some(ShapeType::Skeleton)
        };
        let (manually, interpolated) = keyframe_counts(&track.shapes, self.meta);
        if let (Some(shape_type), Some(stats)) = (shape_type, self.entry(track.label_id)) {
            stats.count(shape_type).track += 1;
            stats.manually += manually;
            stats.interpolated += interpolated;
            stats.total += manually + interpolated;
        }
        for element in &track.elements {
            self.track(element);
        }
    }
}

/// Drawn and interpolated instances of one track.
///
/// Every visible keyframe is drawn; the frames after it up to the next
/// keyframe are interpolated. Nothing follows the last keyframe. Deleted
/// frames count as neither.
fn keyframe_counts(shapes: &[SerializedTrackedShape], meta: &dyn FrameMeta) -> (usize, usize) {
    let mut keyframes: Vec<&SerializedTrackedShape> = shapes.iter().collect();
    keyframes.sort_by_key(|s| s.frame);

    let mut manually = 0;
    let mut interpolated = 0;
    for (i, shape) in keyframes.iter().enumerate() {
        if shape.outside {
            continue;
        }
        if !meta.is_deleted(shape.frame) {
            manually += 1;
        }
        if let Some(next) = keyframes.get(i + 1) {
            interpolated += (shape.frame + 1..next.frame)
                .filter(|frame| !meta.is_deleted(*frame))
                .count();
        }
    }
    (manually, interpolated)
}
