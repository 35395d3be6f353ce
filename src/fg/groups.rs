//! Built-in functional group structs (everything except value mapping).

use glam::DVec3;
use smallvec::SmallVec;

use super::{GroupKind, GroupMacro};
use crate::core::{tags, CodedEntry, Dataset, DatasetExt};
use crate::util::{Error, NumericKind, Result, Tag, VR};

/// Physical pixel size and slice geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PixelMeasures {
    /// Row spacing then column spacing, in mm.
    pub pixel_spacing: Option<[f64; 2]>,
    pub slice_thickness: Option<f64>,
    pub spacing_between_slices: Option<f64>,
}

impl PixelMeasures {
    pub fn new(row_spacing: f64, column_spacing: f64) -> Self {
        Self {
            pixel_spacing: Some([row_spacing, column_spacing]),
            ..Self::default()
        }
    }

    pub fn with_slice_thickness(mut self, thickness: f64) -> Self {
        self.slice_thickness = Some(thickness);
        self
    }

    pub fn with_spacing_between_slices(mut self, spacing: f64) -> Self {
        self.spacing_between_slices = Some(spacing);
        self
    }
}

impl GroupMacro for PixelMeasures {
    const KIND: GroupKind = GroupKind::PixelMeasures;

    fn to_item(&self, _kind: NumericKind) -> Dataset {
        let mut item = Dataset::new_empty();
        if let Some(spacing) = self.pixel_spacing {
            item.put_ds(tags::PIXEL_SPACING, &spacing);
        }
        if let Some(t) = self.slice_thickness {
            item.put_ds(tags::SLICE_THICKNESS, &[t]);
        }
        if let Some(s) = self.spacing_between_slices {
            item.put_ds(tags::SPACING_BETWEEN_SLICES, &[s]);
        }
        item
    }

    fn from_item(item: &Dataset) -> Result<Self> {
        let pixel_spacing = match item.f64_attrs(tags::PIXEL_SPACING)?.as_deref() {
            None => None,
            Some(&[row, col]) => Some([row, col]),
            Some(_) => return Err(Error::InvalidValue { tag: tags::PIXEL_SPACING, expected: "2 values" }),
        };
        Ok(Self {
            pixel_spacing,
            slice_thickness: item.f64_attr(tags::SLICE_THICKNESS)?,
            spacing_between_slices: item.f64_attr(tags::SPACING_BETWEEN_SLICES)?,
        })
    }
}

/// Direction cosines of the first row and first column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneOrientation {
    pub row: DVec3,
    pub column: DVec3,
}

impl PlaneOrientation {
    pub fn new(row: DVec3, column: DVec3) -> Self {
        Self { row, column }
    }

    /// Axial orientation (rows along +X, columns along +Y).
    pub fn axial() -> Self {
        Self::new(DVec3::X, DVec3::Y)
    }

    /// Unit slice normal (row x column), zero for degenerate cosines.
    pub fn normal(&self) -> DVec3 {
        self.row.cross(self.column).normalize_or_zero()
    }

    fn as_values(&self) -> [f64; 6] {
        let (r, c) = (self.row, self.column);
        [r.x, r.y, r.z, c.x, c.y, c.z]
    }
}

impl GroupMacro for PlaneOrientation {
    const KIND: GroupKind = GroupKind::PlaneOrientation;

    fn to_item(&self, _kind: NumericKind) -> Dataset {
        let mut item = Dataset::new_empty();
        item.put_ds(tags::IMAGE_ORIENTATION_PATIENT, &self.as_values());
        item
    }

    fn from_item(item: &Dataset) -> Result<Self> {
        match item.f64_attrs(tags::IMAGE_ORIENTATION_PATIENT)?.as_deref() {
            Some(&[rx, ry, rz, cx, cy, cz]) => Ok(Self::new(DVec3::new(rx, ry, rz), DVec3::new(cx, cy, cz))),
            Some(_) => Err(Error::InvalidValue { tag: tags::IMAGE_ORIENTATION_PATIENT, expected: "6 values" }),
            None => Err(Error::MissingAttribute(tags::IMAGE_ORIENTATION_PATIENT)),
        }
    }
}

/// Position of the first transmitted pixel, in mm.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanePosition {
    pub position: DVec3,
}

impl PlanePosition {
    pub fn new(position: DVec3) -> Self {
        Self { position }
    }

    /// Signed distance along `orientation`'s normal.
    pub fn distance_along(&self, orientation: &PlaneOrientation) -> f64 {
        self.position.dot(orientation.normal())
    }
}

impl GroupMacro for PlanePosition {
    const KIND: GroupKind = GroupKind::PlanePosition;

    fn to_item(&self, _kind: NumericKind) -> Dataset {
        let p = self.position;
        let mut item = Dataset::new_empty();
        item.put_ds(tags::IMAGE_POSITION_PATIENT, &[p.x, p.y, p.z]);
        item
    }

    fn from_item(item: &Dataset) -> Result<Self> {
        match item.f64_attrs(tags::IMAGE_POSITION_PATIENT)?.as_deref() {
            Some(&[x, y, z]) => Ok(Self::new(DVec3::new(x, y, z))),
            Some(_) => Err(Error::InvalidValue { tag: tags::IMAGE_POSITION_PATIENT, expected: "3 values" }),
            None => Err(Error::MissingAttribute(tags::IMAGE_POSITION_PATIENT)),
        }
    }
}

/// Anatomic region and laterality of a frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameAnatomy {
    /// "R", "L", "U" or "B".
    pub laterality: String,
    pub region: CodedEntry,
}

impl FrameAnatomy {
    pub fn new(laterality: impl Into<String>, region: CodedEntry) -> Self {
        Self {
            laterality: laterality.into(),
            region,
        }
    }
}

impl GroupMacro for FrameAnatomy {
    const KIND: GroupKind = GroupKind::FrameAnatomy;

    fn to_item(&self, _kind: NumericKind) -> Dataset {
        let mut item = Dataset::new_empty();
        item.put_text(tags::FRAME_LATERALITY, VR::CS, self.laterality.as_str());
        item.put_single_item(tags::ANATOMIC_REGION_SEQUENCE, self.region.to_item());
        item
    }

    fn from_item(item: &Dataset) -> Result<Self> {
        Ok(Self {
            laterality: item.text_or_default(tags::FRAME_LATERALITY)?,
            region: CodedEntry::from_sequence(item, tags::ANATOMIC_REGION_SEQUENCE)?.unwrap_or_default(),
        })
    }
}

/// Per-frame content: dimension index values and stack placement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameContent {
    /// One value per dimension index entry, in the same order.
    pub dimension_index_values: SmallVec<[u32; 4]>,
    pub stack_id: Option<String>,
    pub in_stack_position: Option<u32>,
    pub temporal_position_index: Option<u32>,
    pub frame_acquisition_number: Option<u16>,
}

impl FrameContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame content carrying the given dimension index values.
    pub fn with_index_values(values: &[u32]) -> Self {
        Self {
            dimension_index_values: SmallVec::from_slice(values),
            ..Self::default()
        }
    }

    /// Append one dimension index value.
    pub fn push_index_value(&mut self, value: u32) {
        self.dimension_index_values.push(value);
    }

    pub fn with_stack(mut self, stack_id: impl Into<String>, position: u32) -> Self {
        self.stack_id = Some(stack_id.into());
        self.in_stack_position = Some(position);
        self
    }
}

impl GroupMacro for FrameContent {
    const KIND: GroupKind = GroupKind::FrameContent;

    fn to_item(&self, _kind: NumericKind) -> Dataset {
        let mut item = Dataset::new_empty();
        if !self.dimension_index_values.is_empty() {
            item.put_ul(tags::DIMENSION_INDEX_VALUES, &self.dimension_index_values);
        }
        if let Some(id) = &self.stack_id {
            item.put_text(tags::STACK_ID, VR::SH, id.as_str());
        }
        put_opt_u32(&mut item, tags::IN_STACK_POSITION_NUMBER, self.in_stack_position);
        put_opt_u32(&mut item, tags::TEMPORAL_POSITION_INDEX, self.temporal_position_index);
        if let Some(n) = self.frame_acquisition_number {
            item.put_us(tags::FRAME_ACQUISITION_NUMBER, n);
        }
        item
    }

    fn from_item(item: &Dataset) -> Result<Self> {
        Ok(Self {
            dimension_index_values: SmallVec::from_vec(item.u32_attrs(tags::DIMENSION_INDEX_VALUES)?),
            stack_id: item.text(tags::STACK_ID)?,
            in_stack_position: item.u32_attr(tags::IN_STACK_POSITION_NUMBER)?,
            temporal_position_index: item.u32_attr(tags::TEMPORAL_POSITION_INDEX)?,
            frame_acquisition_number: item.u16_attr(tags::FRAME_ACQUISITION_NUMBER)?,
        })
    }
}

fn put_opt_u32(item: &mut Dataset, tag: Tag, v: Option<u32>) {
    if let Some(v) = v {
        item.put_ul(tag, &[v]);
    }
}

/// Rescale applied to stored values before display or mapping.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelValueTransformation {
    pub intercept: f64,
    pub slope: f64,
    pub rescale_type: String,
}

impl PixelValueTransformation {
    pub fn new(intercept: f64, slope: f64, rescale_type: impl Into<String>) -> Self {
        Self {
            intercept,
            slope,
            rescale_type: rescale_type.into(),
        }
    }

    /// Identity rescale (intercept 0, slope 1, unspecified units).
    pub fn identity() -> Self {
        Self::new(0.0, 1.0, "US")
    }
}

impl Default for PixelValueTransformation {
    fn default() -> Self {
        Self::identity()
    }
}

impl GroupMacro for PixelValueTransformation {
    const KIND: GroupKind = GroupKind::PixelValueTransformation;

    fn to_item(&self, _kind: NumericKind) -> Dataset {
        let mut item = Dataset::new_empty();
        item.put_ds(tags::RESCALE_INTERCEPT, &[self.intercept]);
        item.put_ds(tags::RESCALE_SLOPE, &[self.slope]);
        item.put_text(tags::RESCALE_TYPE, VR::LO, self.rescale_type.as_str());
        item
    }

    fn from_item(item: &Dataset) -> Result<Self> {
        Ok(Self {
            intercept: item.f64_attr(tags::RESCALE_INTERCEPT)?.unwrap_or(0.0),
            slope: item.f64_attr(tags::RESCALE_SLOPE)?.unwrap_or(1.0),
            rescale_type: item.text_or_default(tags::RESCALE_TYPE)?,
        })
    }
}

/// Frame type values (e.g. `DERIVED\PRIMARY\ADC\NONE`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameType {
    pub values: Vec<String>,
}

impl FrameType {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `DERIVED\PRIMARY` followed by the given image flavor and derived pixel contrast.
    pub fn derived(flavor: &str, contrast: &str) -> Self {
        Self::new(["DERIVED", "PRIMARY", flavor, contrast])
    }
}

impl GroupMacro for FrameType {
    const KIND: GroupKind = GroupKind::FrameType;

    fn to_item(&self, _kind: NumericKind) -> Dataset {
        let mut item = Dataset::new_empty();
        item.put_texts(tags::FRAME_TYPE, VR::CS, self.values.clone());
        item
    }

    fn from_item(item: &Dataset) -> Result<Self> {
        Ok(Self {
            values: item.texts(tags::FRAME_TYPE)?,
        })
    }
}
