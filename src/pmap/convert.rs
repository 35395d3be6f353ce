//! Mapping between [`ParametricMap`] and the generic [`Dataset`].

use dicom_core::header::Header;

use crate::core::{tags, uids, Dataset, DatasetExt, SampleBuffer};
use crate::fg::{FunctionalGroup, FunctionalGroupRegistry, GroupKind};
use crate::util::{Error, NumericKind, Result, Tag, VR};

use super::{DimensionIndex, DimensionIndexModel, Identification, ObjectState, ParametricMap};

const PHOTOMETRIC_INTERPRETATION: &str = "MONOCHROME2";
const DIMENSION_ORGANIZATION_TYPE: &str = "3D";

/// Attribute holding the pixel samples of a kind.
pub const fn pixel_data_tag(kind: NumericKind) -> Tag {
    match kind {
        NumericKind::UInt16 | NumericKind::SInt16 => tags::PIXEL_DATA,
        NumericKind::Float32 => tags::FLOAT_PIXEL_DATA,
        NumericKind::Float64 => tags::DOUBLE_FLOAT_PIXEL_DATA,
    }
}

/// Value representation of the pixel data attribute of a kind.
const fn pixel_data_vr(kind: NumericKind) -> VR {
    match kind {
        NumericKind::UInt16 | NumericKind::SInt16 => VR::OW,
        NumericKind::Float32 => VR::OF,
        NumericKind::Float64 => VR::OD,
    }
}

/// Encode functional groups as one item of group sequences.
fn groups_item(groups: &[FunctionalGroup], kind: NumericKind) -> Dataset {
    let mut item = Dataset::new_empty();
    for g in groups {
        item.put_sequence(g.kind().sequence_tag(), g.to_items(kind));
    }
    item
}

/// Decode every group sequence of a functional groups item.
fn item_groups(item: &Dataset) -> Result<Vec<FunctionalGroup>> {
    item.iter()
        .map(|elem| {
            let tag = elem.tag();
            match elem.items() {
                Some(items) => FunctionalGroup::from_items(GroupKind::from_sequence_tag(tag), items),
                None => Err(Error::InvalidValue { tag, expected: "functional group sequence" }),
            }
        })
        .collect()
}

pub(super) fn to_dataset(map: &ParametricMap) -> Dataset {
    let kind = map.kind;
    let mut ds = Dataset::new_empty();

    map.identification.write_to(&mut ds);
    ds.put_text(tags::SOP_CLASS_UID, VR::UI, uids::PARAMETRIC_MAP_STORAGE);

    ds.put_us(tags::SAMPLES_PER_PIXEL, 1);
    ds.put_text(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, PHOTOMETRIC_INTERPRETATION);
    ds.put_us(tags::ROWS, map.rows);
    ds.put_us(tags::COLUMNS, map.columns);
    ds.put_is(tags::NUMBER_OF_FRAMES, map.frames.len() as i64);
    ds.put_us(tags::BITS_ALLOCATED, kind.bits_allocated());
    if !kind.is_float() {
        ds.put_us(tags::BITS_STORED, kind.bits_allocated());
        ds.put_us(tags::HIGH_BIT, kind.bits_allocated() - 1);
        ds.put_us(tags::PIXEL_REPRESENTATION, kind.pixel_representation());
    }

    let mut pixels = Vec::with_capacity(map.frames.len() * map.samples_per_frame() * kind.num_bytes());
    for frame in &map.frames {
        frame.write_le(&mut pixels);
    }
    ds.put_binary(pixel_data_tag(kind), pixel_data_vr(kind), pixels);

    ds.put_single_item(tags::SHARED_FUNCTIONAL_GROUPS_SEQUENCE, groups_item(map.registry.shared(), kind));
    let per_frame = (0..map.registry.num_frames())
        .map(|i| groups_item(map.registry.frame_groups(i).unwrap_or_default(), kind))
        .collect();
    ds.put_sequence(tags::PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE, per_frame);

    if !map.dimensions.is_empty() {
        let organizations = map
            .dimensions
            .organization_uids()
            .into_iter()
            .map(|uid| {
                let mut item = Dataset::new_empty();
                item.put_text(tags::DIMENSION_ORGANIZATION_UID, VR::UI, uid);
                item
            })
            .collect();
        ds.put_sequence(tags::DIMENSION_ORGANIZATION_SEQUENCE, organizations);
        ds.put_text(tags::DIMENSION_ORGANIZATION_TYPE, VR::CS, DIMENSION_ORGANIZATION_TYPE);
        ds.put_sequence(
            tags::DIMENSION_INDEX_SEQUENCE,
            map.dimensions.entries().iter().map(DimensionIndex::to_item).collect(),
        );
    }
    ds
}

/// Numeric kind declared by the pixel module.
fn numeric_kind(ds: &Dataset) -> Result<NumericKind> {
    let bits = ds.req_u16(tags::BITS_ALLOCATED)?;
    let float_data = ds.has_attr(tags::FLOAT_PIXEL_DATA) || ds.has_attr(tags::DOUBLE_FLOAT_PIXEL_DATA);
    let representation = ds.u16_attr(tags::PIXEL_REPRESENTATION)?.unwrap_or(0);
    NumericKind::from_pixel_module(bits, representation, float_data).ok_or_else(|| {
        Error::invalid(format!(
            "unsupported pixel module: {} bits, representation {}, float {}",
            bits, representation, float_data
        ))
    })
}

pub(super) fn from_dataset(ds: &Dataset) -> Result<ParametricMap> {
    match ds.text(tags::SOP_CLASS_UID)?.as_deref() {
        Some(uids::PARAMETRIC_MAP_STORAGE) => {}
        Some(_) => {
            return Err(Error::InvalidValue {
                tag: tags::SOP_CLASS_UID,
                expected: "parametric map storage SOP class",
            })
        }
        None => return Err(Error::MissingAttribute(tags::SOP_CLASS_UID)),
    }

    let rows = ds.req_u16(tags::ROWS)?;
    let columns = ds.req_u16(tags::COLUMNS)?;
    if rows == 0 || columns == 0 {
        return Err(Error::InvalidGeometry { rows, columns });
    }
    let kind = numeric_kind(ds)?;
    let num_frames = ds
        .u32_attr(tags::NUMBER_OF_FRAMES)?
        .ok_or(Error::MissingAttribute(tags::NUMBER_OF_FRAMES))? as usize;

    let pixel_tag = pixel_data_tag(kind);
    let pixels = ds.binary(pixel_tag)?.ok_or(Error::MissingAttribute(pixel_tag))?;
    let frame_bytes = usize::from(rows) * usize::from(columns) * kind.num_bytes();
    let expected = frame_bytes.checked_mul(num_frames).ok_or_else(|| {
        Error::invalid(format!("{} frames of {} bytes overflow the address space", num_frames, frame_bytes))
    })?;
    if pixels.len() != expected {
        return Err(Error::invalid(format!(
            "pixel data holds {} bytes, expected {} frames of {} bytes",
            pixels.len(),
            num_frames,
            frame_bytes
        )));
    }
    let frames = pixels
        .chunks_exact(frame_bytes)
        .map(|chunk| SampleBuffer::from_le_bytes(kind, chunk))
        .collect::<Result<Vec<_>>>()?;

    let mut registry = FunctionalGroupRegistry::new();
    if let Some(shared) = ds.first_item(tags::SHARED_FUNCTIONAL_GROUPS_SEQUENCE)? {
        for group in item_groups(shared)? {
            registry.add_shared(group)?;
        }
    }
    let per_frame = ds.sequence_items(tags::PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE)?;
    if per_frame.len() != num_frames {
        return Err(Error::invalid(format!(
            "{} per-frame functional group items for {} frames",
            per_frame.len(),
            num_frames
        )));
    }
    for item in per_frame {
        registry.push_frame(item_groups(item)?)?;
    }

    let dimensions = ds
        .sequence_items(tags::DIMENSION_INDEX_SEQUENCE)?
        .iter()
        .map(DimensionIndex::from_item)
        .collect::<Result<DimensionIndexModel>>()?;

    Ok(ParametricMap {
        kind,
        rows,
        columns,
        identification: Identification::from_dataset(ds)?,
        registry,
        dimensions,
        frames,
        state: ObjectState::Loaded,
        validation: Default::default(),
    })
}
