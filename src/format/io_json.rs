//! JSON reading and writing of serialized collections.
//!
//! The persistence layer owns the wire format; these helpers exist for
//! fixtures, the inspection CLI and debugging exports.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::model::SerializedCollection;
use crate::error::FramelabelError;

/// Reads a serialized collection from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_collection_json(path: &Path) -> Result<SerializedCollection, FramelabelError> {
    let file = File::open(path).map_err(FramelabelError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| FramelabelError::JsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a serialized collection to a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_collection_json(
    path: &Path,
    collection: &SerializedCollection,
) -> Result<(), FramelabelError> {
    let file = File::create(path).map_err(FramelabelError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, collection).map_err(|source| FramelabelError::JsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a serialized collection from a JSON string.
pub fn from_json_str(json: &str) -> Result<SerializedCollection, serde_json::Error> {
    serde_json::from_str(json)
}

/// Parses a serialized collection from raw bytes.
pub fn from_json_slice(bytes: &[u8]) -> Result<SerializedCollection, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Serializes a collection to a pretty-printed JSON string.
pub fn to_json_string(collection: &SerializedCollection) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(collection)
}
