//! Core layer - fundamental types shared by the object model and the codec.
//!
//! This module provides:
//! - [`Dataset`] / [`DatasetExt`] - the generic attribute tree at the codec boundary
//! - [`SampleBuffer`] / [`Sample`] / [`SampleVisitor`] - typed frame samples
//! - [`CodedEntry`] / [`ContentItem`] - opaque codes
//! - [`UidProvider`] / [`UidGenerator`] - identifier provisioning
//! - [`tags`] / [`uids`] - the standard data dictionary

mod dataset;
mod sample;
mod code;
mod uid;

pub use dataset::{Dataset, DatasetExt, Element};
pub use sample::{Sample, SampleBuffer, SampleVisitor};
pub use code::{CodedEntry, ContentItem};
pub use uid::{UidGenerator, UidProvider};

pub use dicom_dictionary_std::{tags, uids};
