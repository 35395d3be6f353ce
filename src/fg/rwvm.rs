//! Real world value mapping - stored sample values to physical quantities.
//!
//! An [`RwvmItem`] is well formed with exactly one of the two mapping forms:
//! a linear slope/intercept pair or an explicit lookup table. Items may be
//! assembled in any order; the form and the bounds are only checked by
//! [`RwvmItem::validate`], which the object runs on save.

use std::fmt;

use crate::core::{tags, CodedEntry, ContentItem, Dataset, DatasetExt};
use crate::util::{Error, NumericKind, Result, Tag, VR};

/// Why an item does not specify exactly one mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnderspecifiedReason {
    /// Both slope/intercept and a LUT are set.
    BothForms,
    /// Neither form is set.
    NoForm,
    /// Only one of slope and intercept is set.
    IncompleteLinear,
    /// LUT present but empty.
    EmptyLut,
}

impl fmt::Display for UnderspecifiedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BothForms => "both slope/intercept and LUT are set",
            Self::NoForm => "neither slope/intercept nor LUT is set",
            Self::IncompleteLinear => "slope and intercept must be set together",
            Self::EmptyLut => "LUT has no entries",
        };
        f.write_str(s)
    }
}

/// The mapping form an item resolves to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MappingForm<'a> {
    Linear { slope: f64, intercept: f64 },
    Lut(&'a [f64]),
}

/// One real world value mapping item.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RwvmItem {
    /// First stored value covered by this mapping.
    pub first_value_mapped: f64,
    /// Last stored value covered by this mapping.
    pub last_value_mapped: f64,
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
    pub lut_data: Option<Vec<f64>>,
    pub units: Option<CodedEntry>,
    pub lut_label: String,
    pub lut_explanation: String,
    /// Ordered; duplicates are legal.
    pub quantity_definitions: Vec<ContentItem>,
}

impl RwvmItem {
    /// Empty item covering `[first, last]`; no mapping form set yet.
    pub fn new(first_value_mapped: f64, last_value_mapped: f64) -> Self {
        Self {
            first_value_mapped,
            last_value_mapped,
            ..Self::default()
        }
    }

    /// Linear item `real = stored * slope + intercept`.
    pub fn linear(first: f64, last: f64, slope: f64, intercept: f64) -> Self {
        Self::new(first, last).with_linear(slope, intercept)
    }

    /// LUT item; `lut[0]` maps `first`.
    pub fn lut(first: f64, last: f64, lut: Vec<f64>) -> Self {
        Self::new(first, last).with_lut(lut)
    }

    pub fn with_linear(mut self, slope: f64, intercept: f64) -> Self {
        self.slope = Some(slope);
        self.intercept = Some(intercept);
        self
    }

    pub fn with_lut(mut self, lut: Vec<f64>) -> Self {
        self.lut_data = Some(lut);
        self
    }

    pub fn with_units(mut self, units: CodedEntry) -> Self {
        self.units = Some(units);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>, explanation: impl Into<String>) -> Self {
        self.lut_label = label.into();
        self.lut_explanation = explanation.into();
        self
    }

    /// Append a quantity definition.
    pub fn add_quantity_definition(&mut self, item: ContentItem) {
        self.quantity_definitions.push(item);
    }

    /// Resolve the mapping form, or why there is none.
    pub fn form(&self) -> std::result::Result<MappingForm<'_>, UnderspecifiedReason> {
        let linear = match (self.slope, self.intercept) {
            (Some(slope), Some(intercept)) => Some(MappingForm::Linear { slope, intercept }),
            (None, None) => None,
            _ if self.lut_data.is_some() => return Err(UnderspecifiedReason::BothForms),
            _ => return Err(UnderspecifiedReason::IncompleteLinear),
        };
        match (linear, self.lut_data.as_deref()) {
            (Some(_), Some(_)) => Err(UnderspecifiedReason::BothForms),
            (Some(form), None) => Ok(form),
            (None, Some([])) => Err(UnderspecifiedReason::EmptyLut),
            (None, Some(lut)) => Ok(MappingForm::Lut(lut)),
            (None, None) => Err(UnderspecifiedReason::NoForm),
        }
    }

    /// Check the item is well specified and its bounds are stored exactly by
    /// `kind`. `frame` is `None` for shared mappings.
    pub fn validate(&self, kind: NumericKind, frame: Option<usize>, item: usize) -> Result<()> {
        self.form()
            .map_err(|reason| Error::MappingUnderspecified { frame, item, reason })?;
        let (first, last) = (self.first_value_mapped, self.last_value_mapped);
        if !kind.can_represent(first) || !kind.can_represent(last) {
            return Err(Error::MappingRange { frame, item, kind, first, last });
        }
        Ok(())
    }

    /// Map a stored value. `None` if underspecified or outside the LUT range.
    pub fn map_value(&self, stored: f64) -> Option<f64> {
        match self.form().ok()? {
            MappingForm::Linear { slope, intercept } => Some(stored * slope + intercept),
            MappingForm::Lut(lut) => {
                let offset = stored - self.first_value_mapped;
                if !offset.is_finite() || offset < 0.0 {
                    return None;
                }
                lut.get(offset.round() as usize).copied()
            }
        }
    }

    /// Encode; integer kinds use the 16-bit first/last attributes, float kinds the double ones.
    ///
    /// Bounds are expected to have passed [`RwvmItem::validate`] for `kind`;
    /// out-of-range integer bounds saturate.
    pub fn to_item(&self, kind: NumericKind) -> Dataset {
        let mut item = Dataset::new_empty();
        let (first, last) = (self.first_value_mapped, self.last_value_mapped);
        match kind {
            NumericKind::UInt16 => {
                item.put_us(tags::REAL_WORLD_VALUE_FIRST_VALUE_MAPPED, first as u16);
                item.put_us(tags::REAL_WORLD_VALUE_LAST_VALUE_MAPPED, last as u16);
            }
            NumericKind::SInt16 => {
                item.put_ss(tags::REAL_WORLD_VALUE_FIRST_VALUE_MAPPED, first as i16);
                item.put_ss(tags::REAL_WORLD_VALUE_LAST_VALUE_MAPPED, last as i16);
            }
            NumericKind::Float32 | NumericKind::Float64 => {
                item.put_fd(tags::DOUBLE_FLOAT_REAL_WORLD_VALUE_FIRST_VALUE_MAPPED, &[first]);
                item.put_fd(tags::DOUBLE_FLOAT_REAL_WORLD_VALUE_LAST_VALUE_MAPPED, &[last]);
            }
        }
        if let Some(slope) = self.slope {
            item.put_fd(tags::REAL_WORLD_VALUE_SLOPE, &[slope]);
        }
        if let Some(intercept) = self.intercept {
            item.put_fd(tags::REAL_WORLD_VALUE_INTERCEPT, &[intercept]);
        }
        if let Some(lut) = &self.lut_data {
            item.put_fd(tags::REAL_WORLD_VALUE_LUT_DATA, lut);
        }
        if let Some(units) = &self.units {
            item.put_single_item(tags::MEASUREMENT_UNITS_CODE_SEQUENCE, units.to_item());
        }
        item.put_text(tags::LUT_LABEL, VR::SH, self.lut_label.as_str());
        item.put_text(tags::LUT_EXPLANATION, VR::LO, self.lut_explanation.as_str());
        if !self.quantity_definitions.is_empty() {
            item.put_sequence(
                tags::QUANTITY_DEFINITION_SEQUENCE,
                self.quantity_definitions.iter().map(ContentItem::to_item).collect(),
            );
        }
        item
    }

    pub fn from_item(item: &Dataset) -> Result<Self> {
        Ok(Self {
            first_value_mapped: mapped_bound(
                item,
                tags::DOUBLE_FLOAT_REAL_WORLD_VALUE_FIRST_VALUE_MAPPED,
                tags::REAL_WORLD_VALUE_FIRST_VALUE_MAPPED,
            )?,
            last_value_mapped: mapped_bound(
                item,
                tags::DOUBLE_FLOAT_REAL_WORLD_VALUE_LAST_VALUE_MAPPED,
                tags::REAL_WORLD_VALUE_LAST_VALUE_MAPPED,
            )?,
            slope: item.f64_attr(tags::REAL_WORLD_VALUE_SLOPE)?,
            intercept: item.f64_attr(tags::REAL_WORLD_VALUE_INTERCEPT)?,
            lut_data: item.f64_attrs(tags::REAL_WORLD_VALUE_LUT_DATA)?,
            units: CodedEntry::from_sequence(item, tags::MEASUREMENT_UNITS_CODE_SEQUENCE)?,
            lut_label: item.text_or_default(tags::LUT_LABEL)?,
            lut_explanation: item.text_or_default(tags::LUT_EXPLANATION)?,
            quantity_definitions: item
                .sequence_items(tags::QUANTITY_DEFINITION_SEQUENCE)?
                .iter()
                .map(ContentItem::from_item)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

/// Read a bound from the double attribute, else the 16-bit one, else 0.
fn mapped_bound(item: &Dataset, double_tag: Tag, int_tag: Tag) -> Result<f64> {
    if let Some(v) = item.f64_attr(double_tag)? {
        return Ok(v);
    }
    Ok(item.i32_attr(int_tag)?.map(f64::from).unwrap_or(0.0))
}

/// Real world value mapping functional group: one or more items.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RealWorldValueMapping {
    pub items: Vec<RwvmItem>,
}

impl RealWorldValueMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: RwvmItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn push(&mut self, item: RwvmItem) {
        self.items.push(item);
    }

    /// Validate every item against `kind`, stopping at the first bad one.
    pub fn validate(&self, kind: NumericKind, frame: Option<usize>) -> Result<()> {
        self.items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| item.validate(kind, frame, i))
    }

    pub fn to_items(&self, kind: NumericKind) -> Vec<Dataset> {
        self.items.iter().map(|i| i.to_item(kind)).collect()
    }

    pub fn from_items(items: &[Dataset]) -> Result<Self> {
        Ok(Self {
            items: items.iter().map(RwvmItem::from_item).collect::<Result<Vec<_>>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adc_quantity() -> ContentItem {
        ContentItem::new(
            CodedEntry::new("G-C1C6", "SRT", "Quantity"),
            CodedEntry::new("113041", "DCM", "Apparent Diffusion Coefficient"),
        )
    }

    #[test]
    fn test_forms() {
        assert!(matches!(
            RwvmItem::linear(0.0, 100.0, 0.5, -1.0).form(),
            Ok(MappingForm::Linear { slope, intercept }) if slope == 0.5 && intercept == -1.0
        ));
        assert!(matches!(RwvmItem::lut(0.0, 2.0, vec![1.0, 2.0, 3.0]).form(), Ok(MappingForm::Lut(_))));
    }

    #[test]
    fn test_underspecified() {
        let both = RwvmItem::linear(0.0, 2.0, 1.0, 0.0).with_lut(vec![0.0, 1.0, 2.0]);
        assert_eq!(both.form().unwrap_err(), UnderspecifiedReason::BothForms);

        let neither = RwvmItem::new(0.0, 10.0);
        assert_eq!(neither.form().unwrap_err(), UnderspecifiedReason::NoForm);

        let mut half = RwvmItem::new(0.0, 10.0);
        half.slope = Some(2.0);
        assert_eq!(half.form().unwrap_err(), UnderspecifiedReason::IncompleteLinear);

        half.lut_data = Some(vec![1.0]);
        assert_eq!(half.form().unwrap_err(), UnderspecifiedReason::BothForms);

        let empty = RwvmItem::lut(0.0, 0.0, Vec::new());
        assert_eq!(empty.form().unwrap_err(), UnderspecifiedReason::EmptyLut);
    }

    #[test]
    fn test_validate_error_context() {
        let mapping = RealWorldValueMapping::new()
            .with_item(RwvmItem::linear(0.0, 1.0, 1.0, 0.0))
            .with_item(RwvmItem::new(0.0, 1.0));
        let err = mapping.validate(NumericKind::UInt16, Some(3)).unwrap_err();
        assert!(matches!(
            err,
            Error::MappingUnderspecified { frame: Some(3), item: 1, reason: UnderspecifiedReason::NoForm }
        ));
    }

    #[test]
    fn test_map_value() {
        let linear = RwvmItem::linear(0.0, 4095.0, 0.001, 0.0);
        assert_eq!(linear.map_value(1000.0), Some(1.0));

        let lut = RwvmItem::lut(10.0, 12.0, vec![0.1, 0.2, 0.3]);
        assert_eq!(lut.map_value(11.0), Some(0.2));
        assert_eq!(lut.map_value(9.0), None);
        assert_eq!(lut.map_value(13.0), None);
        assert_eq!(lut.map_value(f64::NAN), None);
        assert_eq!(lut.map_value(f64::INFINITY), None);
    }

    #[test]
    fn test_bounds_must_fit_kind() {
        let item = RwvmItem::linear(-5.0, 70000.0, 1.0, 0.0);
        let err = item.validate(NumericKind::UInt16, None, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::MappingRange { frame: None, item: 0, kind: NumericKind::UInt16, .. }
        ));
        assert!(item.validate(NumericKind::SInt16, None, 0).is_err());
        assert!(item.validate(NumericKind::Float32, None, 0).is_ok());

        let fractional = RwvmItem::linear(0.5, 10.0, 1.0, 0.0);
        assert!(fractional.validate(NumericKind::SInt16, Some(1), 0).is_err());

        let nan = RwvmItem::linear(f64::NAN, 1.0, 1.0, 0.0);
        assert!(nan.validate(NumericKind::Float64, None, 0).is_err());
    }

    #[test]
    fn test_quantity_definitions_keep_duplicates() {
        let mut item = RwvmItem::linear(0.0, 1.0, 1.0, 0.0);
        item.add_quantity_definition(adc_quantity());
        item.add_quantity_definition(adc_quantity());
        assert_eq!(item.quantity_definitions.len(), 2);

        let back = RwvmItem::from_item(&item.to_item(NumericKind::Float32)).unwrap();
        assert_eq!(back.quantity_definitions.len(), 2);
        assert_eq!(back, item);
    }

    #[test]
    fn test_item_bounds_by_kind() {
        let item = RwvmItem::linear(0.0, 4095.0, 1.0, 0.0)
            .with_units(CodedEntry::new("um2/s", "UCUM", "um2/s"))
            .with_label("ADC", "ADC in um2/s");

        let ds = item.to_item(NumericKind::UInt16);
        assert_eq!(ds.u16_attr(tags::REAL_WORLD_VALUE_LAST_VALUE_MAPPED).unwrap(), Some(4095));
        assert!(!ds.has_attr(tags::DOUBLE_FLOAT_REAL_WORLD_VALUE_LAST_VALUE_MAPPED));
        assert_eq!(RwvmItem::from_item(&ds).unwrap(), item);

        let signed = RwvmItem::linear(-100.0, 100.0, 1.0, 0.0);
        let ds = signed.to_item(NumericKind::SInt16);
        assert_eq!(ds.i32_attr(tags::REAL_WORLD_VALUE_FIRST_VALUE_MAPPED).unwrap(), Some(-100));
        assert_eq!(RwvmItem::from_item(&ds).unwrap(), signed);

        let ds = item.to_item(NumericKind::Float64);
        assert_eq!(ds.f64_attr(tags::DOUBLE_FLOAT_REAL_WORLD_VALUE_LAST_VALUE_MAPPED).unwrap(), Some(4095.0));
    }
}
