use std::path::PathBuf;
use thiserror::Error;

use crate::format::ClientId;

/// The main error type for framelabel operations.
#[derive(Debug, Error)]
pub enum FramelabelError {
    /// The caller passed a malformed or out-of-domain value.
    #[error("Argument error: {0}")]
    Argument(String),

    /// An annotation payload is structurally invalid.
    #[error("Data error: {0}")]
    Data(String),

    /// An internal contract was violated.
    #[error("Scripting error: {0}")]
    Scripting(String),

    #[error("Interpolation is not possible for object {client_id} at frame {frame}: no keyframe on either side")]
    InterpolationNotPossible { client_id: ClientId, frame: u32 },

    /// One or more skeleton elements rejected a save; the skeleton was rolled back.
    #[error("Skeleton {client_id} was not saved: {} element error(s)", errors.len())]
    Skeleton {
        client_id: ClientId,
        errors: Vec<FramelabelError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse annotations JSON from {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write annotations JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse task metadata YAML from {path}: {source}")]
    YamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl FramelabelError {
    pub(crate) fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    pub(crate) fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }

    pub(crate) fn scripting(message: impl Into<String>) -> Self {
        Self::Scripting(message.into())
    }
}
