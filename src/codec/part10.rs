//! DICOM file codec.

use dicom_object::meta::FileMetaTableBuilder;
use tracing::trace;

use super::DatasetCodec;
use crate::core::{tags, uids, Dataset, DatasetExt};
use crate::util::{CodecError, Tag};

/// Implementation version name recorded in the file meta group (at most 16 characters).
pub const DEFAULT_IMPLEMENTATION_VERSION_NAME: &str = concat!("PMAP_", env!("CARGO_PKG_VERSION"));

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

/// Explicit VR little endian DICOM file codec.
#[derive(Clone, Debug)]
pub struct Part10Codec {
    implementation_version_name: String,
}

impl Part10Codec {
    pub fn new() -> Self {
        Self {
            implementation_version_name: DEFAULT_IMPLEMENTATION_VERSION_NAME.to_string(),
        }
    }

    /// Set the implementation version name written to the file meta group.
    pub fn with_implementation_version_name(mut self, name: impl Into<String>) -> Self {
        self.implementation_version_name = name.into();
        self
    }

    pub fn implementation_version_name(&self) -> &str {
        &self.implementation_version_name
    }

    fn meta_uid(dataset: &Dataset, tag: Tag) -> Result<String, CodecError> {
        dataset
            .text(tag)
            .ok()
            .flatten()
            .ok_or(CodecError::MissingMetaAttribute(tag))
    }
}

impl Default for Part10Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetCodec for Part10Codec {
    fn encode(&self, dataset: &Dataset) -> Result<Vec<u8>, CodecError> {
        let meta = FileMetaTableBuilder::new()
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .media_storage_sop_class_uid(Self::meta_uid(dataset, tags::SOP_CLASS_UID)?)
            .media_storage_sop_instance_uid(Self::meta_uid(dataset, tags::SOP_INSTANCE_UID)?)
            .implementation_version_name(self.implementation_version_name.as_str());
        let file = dataset
            .clone()
            .with_meta(meta)
            .map_err(|e| CodecError::Meta(e.to_string()))?;

        let mut out = Vec::with_capacity(64 * 1024);
        file.write_all(&mut out).map_err(|e| CodecError::Write(e.to_string()))?;
        trace!("encoded {} bytes", out.len());
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Dataset, CodecError> {
        // The reader starts at the magic code; skip the preamble when present.
        let body = match bytes.get(PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()) {
            Some(magic) if magic == MAGIC => &bytes[PREAMBLE_LEN..],
            _ => bytes,
        };
        if !body.starts_with(MAGIC) {
            return Err(CodecError::Read("missing DICM magic code".to_string()));
        }
        let file = dicom_object::from_reader(body).map_err(|e| CodecError::Read(e.to_string()))?;
        trace!("decoded {} bytes", bytes.len());
        Ok(file.into_inner())
    }
}
