//! Typed sample buffers - one frame's worth of samples of a single numeric kind.
//!
//! [`SampleBuffer`] is a closed sum over the four [`NumericKind`]s. Code that
//! must behave differently per kind either matches on it directly or goes
//! through [`SampleVisitor`], which has exactly one handler per kind.

use byteorder::{ByteOrder, LittleEndian};
use bytemuck::{Pod, Zeroable};
use std::fmt;

use crate::util::{Error, NumericKind, Result};

/// Primitive types that can be stored as frame samples.
pub trait Sample: Pod + Zeroable + Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The corresponding [`NumericKind`].
    const KIND: NumericKind;

    /// Widen to f64 (used by value mapping).
    fn to_f64(self) -> f64;

    /// Wrap a vector of samples into a buffer.
    fn wrap(samples: Vec<Self>) -> SampleBuffer;

    /// View a buffer as a slice of this type, `None` if the kind differs.
    fn view(buffer: &SampleBuffer) -> Option<&[Self]>;
}

macro_rules! impl_sample {
    ($ty:ty, $variant:ident) => {
        impl Sample for $ty {
            const KIND: NumericKind = NumericKind::$variant;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn wrap(samples: Vec<Self>) -> SampleBuffer {
                SampleBuffer::$variant(samples)
            }

            #[inline]
            fn view(buffer: &SampleBuffer) -> Option<&[Self]> {
                match buffer {
                    SampleBuffer::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl From<Vec<$ty>> for SampleBuffer {
            fn from(samples: Vec<$ty>) -> Self {
                SampleBuffer::$variant(samples)
            }
        }
    };
}

impl_sample!(u16, UInt16);
impl_sample!(i16, SInt16);
impl_sample!(f32, Float32);
impl_sample!(f64, Float64);

/// Per-kind operation over a sample buffer.
///
/// Implementors supply one handler per numeric kind. Failures (missing
/// frame, wrong kind) are reported by the dispatching call as an `Err`, so a
/// handler only ever sees well-typed samples.
pub trait SampleVisitor {
    type Output;

    fn visit_u16(&mut self, samples: &[u16]) -> Self::Output;
    fn visit_i16(&mut self, samples: &[i16]) -> Self::Output;
    fn visit_f32(&mut self, samples: &[f32]) -> Self::Output;
    fn visit_f64(&mut self, samples: &[f64]) -> Self::Output;
}

/// Dense samples of one frame.
#[derive(Clone, PartialEq)]
pub enum SampleBuffer {
    UInt16(Vec<u16>),
    SInt16(Vec<i16>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl SampleBuffer {
    /// Create a buffer from any sample vector.
    pub fn from_vec<T: Sample>(samples: Vec<T>) -> Self {
        T::wrap(samples)
    }

    /// Create a zero-filled buffer of the given kind and length.
    pub fn zeroed(kind: NumericKind, len: usize) -> Self {
        match kind {
            NumericKind::UInt16 => Self::UInt16(vec![0; len]),
            NumericKind::SInt16 => Self::SInt16(vec![0; len]),
            NumericKind::Float32 => Self::Float32(vec![0.0; len]),
            NumericKind::Float64 => Self::Float64(vec![0.0; len]),
        }
    }

    /// The numeric kind of this buffer.
    #[inline]
    pub const fn kind(&self) -> NumericKind {
        match self {
            Self::UInt16(_) => NumericKind::UInt16,
            Self::SInt16(_) => NumericKind::SInt16,
            Self::Float32(_) => NumericKind::Float32,
            Self::Float64(_) => NumericKind::Float64,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            Self::UInt16(v) => v.len(),
            Self::SInt16(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fail with [`Error::TypeMismatch`] unless this buffer is of `expected` kind.
    pub fn ensure_kind(&self, expected: NumericKind) -> Result<()> {
        if self.kind() == expected {
            Ok(())
        } else {
            Err(Error::TypeMismatch { expected, actual: self.kind() })
        }
    }

    /// Typed view of the samples.
    pub fn as_slice<T: Sample>(&self) -> Result<&[T]> {
        T::view(self).ok_or(Error::TypeMismatch {
            expected: T::KIND,
            actual: self.kind(),
        })
    }

    /// Read one sample widened to f64.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        match self {
            Self::UInt16(v) => v.get(index).map(|s| s.to_f64()),
            Self::SInt16(v) => v.get(index).map(|s| s.to_f64()),
            Self::Float32(v) => v.get(index).map(|s| s.to_f64()),
            Self::Float64(v) => v.get(index).copied(),
        }
    }

    /// Raw native-endian bytes of the samples.
    pub fn raw_bytes(&self) -> &[u8] {
        match self {
            Self::UInt16(v) => bytemuck::cast_slice(v),
            Self::SInt16(v) => bytemuck::cast_slice(v),
            Self::Float32(v) => bytemuck::cast_slice(v),
            Self::Float64(v) => bytemuck::cast_slice(v),
        }
    }

    /// Dispatch to the visitor handler for this buffer's kind.
    pub fn visit<V: SampleVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Self::UInt16(v) => visitor.visit_u16(v),
            Self::SInt16(v) => visitor.visit_i16(v),
            Self::Float32(v) => visitor.visit_f32(v),
            Self::Float64(v) => visitor.visit_f64(v),
        }
    }

    /// Append the samples as little-endian bytes.
    pub fn write_le(&self, out: &mut Vec<u8>) {
        self.visit(&mut LeWriter { out });
    }

    /// Decode little-endian bytes into a buffer of `kind`.
    pub fn from_le_bytes(kind: NumericKind, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % kind.num_bytes() != 0 {
            return Err(Error::invalid(format!(
                "{} bytes is not a whole number of {} samples",
                bytes.len(),
                kind
            )));
        }
        let len = bytes.len() / kind.num_bytes();
        let mut buffer = Self::zeroed(kind, len);
        match &mut buffer {
            Self::UInt16(v) => LittleEndian::read_u16_into(bytes, v),
            Self::SInt16(v) => LittleEndian::read_i16_into(bytes, v),
            Self::Float32(v) => LittleEndian::read_f32_into(bytes, v),
            Self::Float64(v) => LittleEndian::read_f64_into(bytes, v),
        }
        Ok(buffer)
    }
}

impl fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SampleBuffer<{}>[{}]", self.kind(), self.len())
    }
}

/// Little-endian serializer, one handler per kind.
struct LeWriter<'a> {
    out: &'a mut Vec<u8>,
}

impl LeWriter<'_> {
    fn extend(&mut self, n: usize) -> &mut [u8] {
        let start = self.out.len();
        self.out.resize(start + n, 0);
        &mut self.out[start..]
    }
}

impl SampleVisitor for LeWriter<'_> {
    type Output = ();

    fn visit_u16(&mut self, samples: &[u16]) {
        LittleEndian::write_u16_into(samples, self.extend(samples.len() * 2));
    }

    fn visit_i16(&mut self, samples: &[i16]) {
        LittleEndian::write_i16_into(samples, self.extend(samples.len() * 2));
    }

    fn visit_f32(&mut self, samples: &[f32]) {
        LittleEndian::write_f32_into(samples, self.extend(samples.len() * 4));
    }

    fn visit_f64(&mut self, samples: &[f64]) {
        LittleEndian::write_f64_into(samples, self.extend(samples.len() * 8));
    }
}
