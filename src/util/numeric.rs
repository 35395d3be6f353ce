//! Numeric kinds - the closed set of sample representations a parametric map can carry.

use std::fmt;

/// Sample representation shared by every frame of one parametric map.
///
/// The set is fixed: a map is created (or loaded) with exactly one of these
/// and frames of any other kind are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum NumericKind {
    /// Unsigned 16-bit integer samples.
    UInt16 = 0,
    /// Signed 16-bit integer samples.
    SInt16 = 1,
    /// 32-bit IEEE 754 samples.
    Float32 = 2,
    /// 64-bit IEEE 754 samples.
    Float64 = 3,
}

impl NumericKind {
    /// All kinds, in declaration order.
    pub const ALL: [NumericKind; 4] = [Self::UInt16, Self::SInt16, Self::Float32, Self::Float64];

    /// Size in bytes of one sample.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::UInt16 | Self::SInt16 => 2,
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Bits allocated per sample in the encoded dataset.
    #[inline]
    pub const fn bits_allocated(self) -> u16 {
        (self.num_bytes() * 8) as u16
    }

    /// Pixel representation: 1 for signed integers, 0 otherwise.
    #[inline]
    pub const fn pixel_representation(self) -> u16 {
        match self {
            Self::SInt16 => 1,
            _ => 0,
        }
    }

    /// Returns the name of this kind.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UInt16 => "uint16",
            Self::SInt16 => "int16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Parse a kind from its name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "uint16" => Some(Self::UInt16),
            "int16" => Some(Self::SInt16),
            "float32" => Some(Self::Float32),
            "float64" => Some(Self::Float64),
            _ => None,
        }
    }

    /// Returns true for the two floating point kinds.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// True if `v` is a value this kind stores exactly: an in-range integer
    /// for the 16-bit kinds, any finite number for the float kinds.
    pub fn can_represent(self, v: f64) -> bool {
        match self {
            Self::UInt16 => v.fract() == 0.0 && (0.0..=u16::MAX as f64).contains(&v),
            Self::SInt16 => v.fract() == 0.0 && (i16::MIN as f64..=i16::MAX as f64).contains(&v),
            Self::Float32 | Self::Float64 => v.is_finite(),
        }
    }

    /// Recover the kind from the pixel module attributes
    /// (bits allocated, pixel representation, and whether float pixel data is used).
    pub fn from_pixel_module(bits_allocated: u16, pixel_representation: u16, float_data: bool) -> Option<Self> {
        match (bits_allocated, pixel_representation, float_data) {
            (16, 0, false) => Some(Self::UInt16),
            (16, 1, false) => Some(Self::SInt16),
            (32, _, true) => Some(Self::Float32),
            (64, _, true) => Some(Self::Float64),
            _ => None,
        }
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
