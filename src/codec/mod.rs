//! Codec boundary - generic datasets to and from bytes.
//!
//! The object model only ever talks to a [`DatasetCodec`]. [`Part10Codec`]
//! is the bundled implementation: a DICOM file (preamble, file meta group,
//! explicit VR little endian data set) written and read by `dicom-object`.

mod part10;

pub use part10::{Part10Codec, DEFAULT_IMPLEMENTATION_VERSION_NAME};

use crate::core::Dataset;
use crate::util::CodecError;

/// Encoder/decoder for generic datasets.
pub trait DatasetCodec {
    fn encode(&self, dataset: &Dataset) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<Dataset, CodecError>;
}
