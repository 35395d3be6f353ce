//! Utility types shared across the crate.
//!
//! - [`NumericKind`] - the closed set of sample representations
//! - [`Tag`] / [`VR`] - attribute addressing, from `dicom-core`
//! - [`Error`] / [`Result`] - error handling

mod numeric;
mod error;

pub use numeric::*;
pub use error::*;

pub use dicom_core::{Tag, VR};
