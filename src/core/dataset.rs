//! Generic dataset - the attribute tree exchanged with the codec boundary.
//!
//! [`Dataset`] is `dicom-object`'s in-memory data set. [`DatasetExt`] adds
//! the typed accessors the object model needs: setters pick the value
//! representation the attribute is encoded with, getters accept any
//! representation `dicom-core` can convert (so `DS`/`IS` text and binary
//! numbers read the same way).

use std::borrow::Cow;

use dicom_core::value::{DataSetSequence, PrimitiveValue, Value, C};
use dicom_core::{DataElement, Length};
use dicom_object::mem::InMemElement;
use dicom_object::InMemDicomObject;

use crate::util::{Error, Result, Tag, VR};

/// In-memory data set (standard dictionary).
pub type Dataset = InMemDicomObject;

/// One element of a [`Dataset`].
pub type Element = InMemElement;

/// Format a decimal string value. `{}` on f64 is the shortest text that parses back exactly.
fn decimal_string(v: f64) -> String {
    format!("{}", v)
}

/// Typed access to [`Dataset`] attributes.
pub trait DatasetExt {
    /// Element by tag, `None` if absent or present with an empty value.
    fn attr(&self, tag: Tag) -> Option<&Element>;

    fn has_attr(&self, tag: Tag) -> bool;

    fn put_value(&mut self, tag: Tag, vr: VR, value: PrimitiveValue);

    /// Single text value (`vr` selects the text representation).
    fn put_text(&mut self, tag: Tag, vr: VR, s: impl Into<String>) {
        self.put_value(tag, vr, PrimitiveValue::from(s.into()));
    }

    /// Put a text value only if it is not empty.
    fn put_text_nonempty(&mut self, tag: Tag, vr: VR, s: &str) {
        if !s.is_empty() {
            self.put_text(tag, vr, s);
        }
    }

    /// Multi-valued text.
    fn put_texts(&mut self, tag: Tag, vr: VR, values: Vec<String>) {
        self.put_value(tag, vr, PrimitiveValue::Strs(values.into_iter().collect()));
    }

    fn put_us(&mut self, tag: Tag, v: u16) {
        self.put_value(tag, VR::US, PrimitiveValue::U16(C::from_slice(&[v])));
    }

    fn put_ss(&mut self, tag: Tag, v: i16) {
        self.put_value(tag, VR::SS, PrimitiveValue::I16(C::from_slice(&[v])));
    }

    fn put_ul(&mut self, tag: Tag, values: &[u32]) {
        self.put_value(tag, VR::UL, PrimitiveValue::U32(C::from_slice(values)));
    }

    /// Integer string (`IS`).
    fn put_is(&mut self, tag: Tag, v: i64) {
        self.put_value(tag, VR::IS, PrimitiveValue::from(v.to_string()));
    }

    /// Decimal strings (`DS`).
    fn put_ds(&mut self, tag: Tag, values: &[f64]) {
        let strs = values.iter().copied().map(decimal_string).collect();
        self.put_value(tag, VR::DS, PrimitiveValue::Strs(strs));
    }

    /// Binary doubles (`FD`).
    fn put_fd(&mut self, tag: Tag, values: &[f64]) {
        self.put_value(tag, VR::FD, PrimitiveValue::F64(C::from_slice(values)));
    }

    /// Attribute tag reference (`AT`).
    fn put_at(&mut self, tag: Tag, value: Tag) {
        self.put_value(tag, VR::AT, PrimitiveValue::Tags(C::from_slice(&[value])));
    }

    /// Opaque bytes under an `O*` representation.
    fn put_binary(&mut self, tag: Tag, vr: VR, bytes: Vec<u8>) {
        self.put_value(tag, vr, PrimitiveValue::U8(C::from_vec(bytes)));
    }

    fn put_sequence(&mut self, tag: Tag, items: Vec<Dataset>);

    /// Put a single-item sequence.
    fn put_single_item(&mut self, tag: Tag, item: Dataset) {
        self.put_sequence(tag, vec![item]);
    }

    /// First text value with padding trimmed, `None` if absent or empty.
    fn text(&self, tag: Tag) -> Result<Option<String>> {
        let Some(elem) = self.attr(tag) else {
            return Ok(None);
        };
        let s = elem.to_str().map_err(|_| invalid_value(tag, "text"))?;
        let s = trim_padding(&s);
        Ok((!s.is_empty()).then(|| s.to_string()))
    }

    /// First text value or an empty string if absent.
    fn text_or_default(&self, tag: Tag) -> Result<String> {
        Ok(self.text(tag)?.unwrap_or_default())
    }

    /// All text values, empty if absent.
    fn texts(&self, tag: Tag) -> Result<Vec<String>> {
        let Some(elem) = self.attr(tag) else {
            return Ok(Vec::new());
        };
        let values = elem.to_multi_str().map_err(|_| invalid_value(tag, "text"))?;
        Ok(values.iter().map(|v| trim_padding(v).to_string()).collect())
    }

    fn u16_attr(&self, tag: Tag) -> Result<Option<u16>> {
        self.attr(tag)
            .map(|e| e.to_int::<u16>().map_err(|_| invalid_value(tag, "u16")))
            .transpose()
    }

    /// Mandatory u16 value.
    fn req_u16(&self, tag: Tag) -> Result<u16> {
        self.u16_attr(tag)?.ok_or(Error::MissingAttribute(tag))
    }

    /// Any integer value (`US`, `SS` or `IS`) widened to i32.
    fn i32_attr(&self, tag: Tag) -> Result<Option<i32>> {
        self.attr(tag)
            .map(|e| e.to_int::<i32>().map_err(|_| invalid_value(tag, "integer")))
            .transpose()
    }

    fn u32_attr(&self, tag: Tag) -> Result<Option<u32>> {
        self.attr(tag)
            .map(|e| e.to_int::<u32>().map_err(|_| invalid_value(tag, "u32")))
            .transpose()
    }

    /// All u32 values, empty if absent.
    fn u32_attrs(&self, tag: Tag) -> Result<Vec<u32>> {
        match self.attr(tag) {
            None => Ok(Vec::new()),
            Some(e) => e.to_multi_int::<u32>().map_err(|_| invalid_value(tag, "u32")),
        }
    }

    /// All numeric values (`DS` or `FD`), `None` if absent.
    fn f64_attrs(&self, tag: Tag) -> Result<Option<Vec<f64>>> {
        self.attr(tag)
            .map(|e| e.to_multi_float64().map_err(|_| invalid_value(tag, "f64")))
            .transpose()
    }

    fn f64_attr(&self, tag: Tag) -> Result<Option<f64>> {
        self.attr(tag)
            .map(|e| e.to_float64().map_err(|_| invalid_value(tag, "f64")))
            .transpose()
    }

    fn tag_attr(&self, tag: Tag) -> Result<Option<Tag>> {
        match self.attr(tag).map(|e| e.value().primitive()) {
            None => Ok(None),
            Some(Some(PrimitiveValue::Tags(v))) => Ok(v.first().copied()),
            Some(_) => Err(invalid_value(tag, "tag")),
        }
    }

    /// Byte payload in little endian, `None` if absent.
    fn binary(&self, tag: Tag) -> Result<Option<Cow<'_, [u8]>>>;

    /// Sequence items, empty if absent.
    fn sequence_items(&self, tag: Tag) -> Result<&[Dataset]>;

    /// First item of a sequence, `None` if absent or empty.
    fn first_item(&self, tag: Tag) -> Result<Option<&Dataset>> {
        Ok(self.sequence_items(tag)?.first())
    }
}

impl DatasetExt for Dataset {
    fn attr(&self, tag: Tag) -> Option<&Element> {
        let elem = self.element_opt(tag).ok().flatten()?;
        match elem.value() {
            Value::Primitive(PrimitiveValue::Empty) => None,
            _ => Some(elem),
        }
    }

    fn has_attr(&self, tag: Tag) -> bool {
        matches!(self.element_opt(tag), Ok(Some(_)))
    }

    fn put_value(&mut self, tag: Tag, vr: VR, value: PrimitiveValue) {
        self.put(DataElement::new(tag, vr, value));
    }

    fn put_sequence(&mut self, tag: Tag, items: Vec<Dataset>) {
        let seq = DataSetSequence::new(items, Length::UNDEFINED);
        self.put(DataElement::new(tag, VR::SQ, Value::Sequence(seq)));
    }

    fn binary(&self, tag: Tag) -> Result<Option<Cow<'_, [u8]>>> {
        let Some(elem) = self.element_opt(tag).ok().flatten() else {
            return Ok(None);
        };
        // Decoded O* values come back typed by their representation.
        let bytes = match elem.value() {
            Value::Primitive(PrimitiveValue::Empty) => Cow::Borrowed(&[][..]),
            Value::Primitive(PrimitiveValue::U8(v)) => Cow::Borrowed(&v[..]),
            Value::Primitive(PrimitiveValue::U16(v)) => Cow::Owned(le_bytes(v, |x| x.to_le_bytes())),
            Value::Primitive(PrimitiveValue::I16(v)) => Cow::Owned(le_bytes(v, |x| x.to_le_bytes())),
            Value::Primitive(PrimitiveValue::F32(v)) => Cow::Owned(le_bytes(v, |x| x.to_le_bytes())),
            Value::Primitive(PrimitiveValue::F64(v)) => Cow::Owned(le_bytes(v, |x| x.to_le_bytes())),
            _ => return Err(invalid_value(tag, "binary")),
        };
        Ok(Some(bytes))
    }

    fn sequence_items(&self, tag: Tag) -> Result<&[Dataset]> {
        match self.attr(tag) {
            None => Ok(&[]),
            Some(elem) => elem.items().ok_or_else(|| invalid_value(tag, "sequence")),
        }
    }
}

fn le_bytes<T: Copy, const N: usize>(values: &[T], f: impl Fn(T) -> [u8; N]) -> Vec<u8> {
    values.iter().flat_map(|&v| f(v)).collect()
}

fn trim_padding(s: &str) -> &str {
    s.trim_end_matches(|c| c == '\0' || c == ' ')
}

fn invalid_value(tag: Tag, expected: &'static str) -> Error {
    Error::InvalidValue { tag, expected }
}
