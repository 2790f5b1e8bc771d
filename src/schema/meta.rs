//! Per-frame metadata and the task description file.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::{Label, LabelSchema};
use crate::error::FramelabelError;

/// Pixel dimensions of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Frame-level facts the annotation model needs but does not own.
pub trait FrameMeta {
    /// Size of `frame`, or `None` when the frame is outside the task.
    fn frame_size(&self, frame: u32) -> Option<FrameSize>;

    /// Whether `frame` has been deleted from the task.
    fn is_deleted(&self, frame: u32) -> bool;

    fn start_frame(&self) -> u32;

    /// Last frame of the task, inclusive.
    fn stop_frame(&self) -> u32;
}

/// Task description: frame range, sizes, deleted frames and labels.
///
/// ```yaml
/// name: street
/// stop_frame: 99
/// frame_size: { width: 1920, height: 1080 }
/// deleted_frames: [7]
/// labels:
///   - { id: 1, name: car, type: rectangle }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub start_frame: u32,

    pub stop_frame: u32,

    pub frame_size: FrameSize,

    /// Per-frame size overrides for tasks with mixed resolutions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub frame_sizes: BTreeMap<u32, FrameSize>,

    #[serde(default)]
    pub deleted_frames: BTreeSet<u32>,

    #[serde(default)]
    pub labels: Vec<Label>,
}

impl TaskMeta {
    /// Loads task metadata, choosing YAML or JSON by file extension.
    pub fn from_path(path: &Path) -> Result<Self, FramelabelError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let contents = std::fs::read_to_string(path)?;

        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&contents).map_err(|source| FramelabelError::YamlParse {
                path: path.to_path_buf(),
                source,
            }),
            "json" => Self::from_json_str(&contents).map_err(|source| FramelabelError::JsonParse {
                path: path.to_path_buf(),
                source,
            }),
            other => Err(FramelabelError::UnsupportedFormat(format!(
                "task metadata must be .yaml, .yml or .json, got '{}'",
                other
            ))),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Builds the indexed label schema.
    pub fn schema(&self) -> LabelSchema {
        LabelSchema::new(self.labels.clone())
    }
}

impl FrameMeta for TaskMeta {
    fn frame_size(&self, frame: u32) -> Option<FrameSize> {
        if frame < self.start_frame || frame > self.stop_frame {
            return None;
        }
        Some(self.frame_sizes.get(&frame).copied().unwrap_or(self.frame_size))
    }

    fn is_deleted(&self, frame: u32) -> bool {
        self.deleted_frames.contains(&frame)
    }

    fn start_frame(&self) -> u32 {
        self.start_frame
    }

    fn stop_frame(&self) -> u32 {
        self.stop_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LabelType;

    const YAML: &str = r#"
name: street
stop_frame: 9
frame_size: { width: 640, height: 480 }
frame_sizes:
  3: { width: 320, height: 240 }
deleted_frames: [4]
labels:
  - id: 1
    name: car
    type: rectangle
    attributes:
      - { id: 1, name: color, input_type: select, values: [red, blue] }
"#;

    #[test]
    fn test_parse_yaml() {
        let meta = TaskMeta::from_yaml_str(YAML).unwrap();
        assert_eq!(meta.name, "street");
        assert_eq!(meta.start_frame, 0);
        assert_eq!(meta.labels[0].label_type, LabelType::Rectangle);
        assert_eq!(meta.labels[0].attributes[0].values, vec!["red", "blue"]);
    }

    #[test]
    fn test_frame_meta() {
        let meta = TaskMeta::from_yaml_str(YAML).unwrap();
        assert_eq!(meta.frame_size(0), Some(FrameSize { width: 640, height: 480 }));
        assert_eq!(meta.frame_size(3), Some(FrameSize { width: 320, height: 240 }));
        assert_eq!(meta.frame_size(10), None);
        assert!(meta.is_deleted(4));
        assert!(!meta.is_deleted(5));
    }

    #[test]
    fn test_from_path_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.toml");
        std::fs::write(&path, "x").unwrap();
        let err = TaskMeta::from_path(&path).unwrap_err();
        assert!(matches!(err, FramelabelError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_from_path_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.json");
        std::fs::write(
            &path,
            r#"{"stop_frame": 1, "frame_size": {"width": 10, "height": 10}}"#,
        )
        .unwrap();
        let meta = TaskMeta::from_path(&path).unwrap();
        assert_eq!(meta.stop_frame, 1);
        assert!(meta.labels.is_empty());
    }
}
