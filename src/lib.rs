//! # Parametric Map
//!
//! Typed in-memory model of multi-frame parametric map objects: frames of
//! one fixed numeric kind, functional groups attached per frame or shared,
//! an ordered dimension index, and real world value mappings. Objects are
//! validated structurally before they are handed to a codec.
//!
//! ## Modules
//!
//! - [`util`] - Numeric kinds, errors, tag/VR re-exports
//! - [`core`] - Dataset access over `dicom-object`, sample buffers, codes, UIDs
//! - [`fg`] - Functional groups and the shared/per-frame registry
//! - [`pmap`] - The [`ParametricMap`](pmap::ParametricMap) aggregate and its validation
//! - [`codec`] - Dataset codec boundary and the bundled DICOM file codec
//!
//! ## Example
//!
//! ```ignore
//! use parametric_map::prelude::*;
//!
//! let mut map = ParametricMap::create(NumericKind::UInt16, 10, 10, Identification::default())?;
//! map.add_for_all_frames(PixelMeasures::new(1.0, 1.0))?;
//! map.add_for_all_frames(PlaneOrientation::axial())?;
//! map.add_for_all_frames(FrameType::derived("T1", "MIXED"))?;
//! map.add_dimension_index(tags::IN_STACK_POSITION_NUMBER, "1.2.3", "Slice")?;
//! for i in 0..10 {
//!     map.add_frame(vec![0u16; 100], [FrameContent::with_index_values(&[i]).into()])?;
//! }
//! let bytes = map.to_bytes()?;
//!
//! let loaded = ParametricMap::from_bytes(&bytes)?;
//! assert_eq!(loaded.frame_count(), 10);
//! ```

pub mod util;
pub mod core;
pub mod fg;
pub mod pmap;
pub mod codec;

// Re-export commonly used types
pub use util::{CodecError, Error, NumericKind, Result, Tag, VR};
pub use pmap::ParametricMap;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, NumericKind, Result, Tag, VR};
    pub use crate::core::{
        tags, uids, CodedEntry, ContentItem, Dataset, DatasetExt, Sample, SampleBuffer, SampleVisitor, UidGenerator,
        UidProvider,
    };
    pub use crate::fg::*;
    pub use crate::pmap::*;
    pub use crate::codec::{DatasetCodec, Part10Codec};
}
