//! Error types for the parametric map object model.

use std::path::PathBuf;
use thiserror::Error;

use super::{NumericKind, Tag};
use crate::fg::{GroupKind, GroupScope, UnderspecifiedReason};
use crate::pmap::Violation;

/// Failure reported by a [`DatasetCodec`](crate::codec::DatasetCodec).
///
/// Always surfaced to callers wrapped in [`Error::Codec`].
#[derive(Error, Debug)]
pub enum CodecError {
    /// Attribute needed to build the file meta group is absent
    #[error("Cannot build file meta group: missing {0}")]
    MissingMetaAttribute(Tag),

    /// File meta group rejected
    #[error("Invalid file meta group: {0}")]
    Meta(String),

    /// Input is not a readable DICOM file
    #[error("Read failed: {0}")]
    Read(String),

    /// Data set could not be written
    #[error("Write failed: {0}")]
    Write(String),
}

/// Main error type for parametric map operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Samples of one numeric kind used against an object fixed to another
    #[error("Type mismatch: expected {expected} samples, got {actual}")]
    TypeMismatch { expected: NumericKind, actual: NumericKind },

    /// Functional group kind already attached in a conflicting scope
    #[error("Duplicate functional group {kind}: already present ({scope})")]
    DuplicateGroupKind { kind: GroupKind, scope: GroupScope },

    /// Generic lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Functional group kind resolvable neither per-frame nor shared
    #[error("Functional group {kind} not found for frame {frame}")]
    GroupNotFound { frame: usize, kind: GroupKind },

    /// Frame index out of bounds
    #[error("Frame index {index} out of bounds (count: {count})")]
    FrameOutOfBounds { index: usize, count: usize },

    /// Frame supplies the wrong number of dimension index values
    #[error("Frame {frame}: expected {expected} dimension index values, got {actual}")]
    DimensionMismatch { frame: usize, expected: usize, actual: usize },

    /// Real world value mapping item without exactly one mapping form
    #[error("Real world value mapping item {item} is underspecified: {reason}")]
    MappingUnderspecified {
        frame: Option<usize>,
        item: usize,
        reason: UnderspecifiedReason,
    },

    /// Frame buffer length does not match rows x columns
    #[error("Frame {frame}: expected {expected} samples, got {actual}")]
    SampleCountMismatch { frame: usize, expected: usize, actual: usize },

    /// Real world value mapping bounds not representable in the object's numeric kind
    #[error("Real world value mapping item {item}: bounds [{first}, {last}] not representable as {kind}")]
    MappingRange {
        frame: Option<usize>,
        item: usize,
        kind: NumericKind,
        first: f64,
        last: f64,
    },

    /// Custom group declared with the sequence tag of a built-in kind
    #[error("Sequence {tag} belongs to built-in functional group {kind}")]
    ReservedGroupTag { tag: Tag, kind: GroupKind },

    /// Generated identifier exceeds the 64 character limit
    #[error("UID exceeds 64 characters: {0}")]
    UidTooLong(String),

    /// Required identification attribute is empty
    #[error("Missing identification attribute {0}")]
    MissingIdentification(&'static str),

    /// Structural validation failed on save
    #[error("Validation failed: {}", summarize(.violations))]
    ValidationFailed { violations: Vec<Violation> },

    /// Failure at the external codec boundary
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Dataset does not describe a well-formed parametric map
    #[error("Invalid dataset structure: {0}")]
    InvalidStructure(String),

    /// Mandatory attribute absent from a loaded dataset
    #[error("Missing attribute {0}")]
    MissingAttribute(Tag),

    /// Attribute present with an unexpected value type
    #[error("Attribute {tag}: expected {expected}")]
    InvalidValue { tag: Tag, expected: &'static str },

    /// Rows or columns is zero
    #[error("Invalid geometry: {rows} rows x {columns} columns")]
    InvalidGeometry { rows: u16, columns: u16 },

    /// Object was persisted and is read-only
    #[error("Object is persisted and cannot be modified")]
    Frozen,

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Violations carried by a [`Error::ValidationFailed`], empty otherwise.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::ValidationFailed { violations } => violations,
            _ => &[],
        }
    }

    /// The cause of the first violation for validation failures, `self` otherwise.
    pub fn primary(&self) -> &Error {
        match self.violations().first() {
            Some(v) => &v.cause,
            None => self,
        }
    }
}

fn summarize(violations: &[Violation]) -> String {
    match violations {
        [] => "no violations".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

/// Result type alias for parametric map operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::DimensionMismatch { frame: 4, expected: 2, actual: 1 };
        let s = e.to_string();
        assert!(s.contains("Frame 4"));
        assert!(s.contains("expected 2"));

        let e = Error::TypeMismatch {
            expected: NumericKind::UInt16,
            actual: NumericKind::Float32,
        };
        assert!(e.to_string().contains("uint16"));
        assert!(e.to_string().contains("float32"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_codec_error_wrapped() {
        let err: Error = CodecError::Read("missing DICM".to_string()).into();
        assert!(matches!(err, Error::Codec(CodecError::Read(_))));
        assert!(err.to_string().contains("DICM"));
    }

    #[test]
    fn test_primary_of_plain_error() {
        let e = Error::Frozen;
        assert!(e.violations().is_empty());
        assert!(matches!(e.primary(), Error::Frozen));
    }
}
