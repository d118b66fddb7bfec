//! Typed field descriptors for fixed-width records.
//!
//! A record is a sequence of primitive fields at known byte offsets. Each
//! field is declared once as a [`Field<T>`] constant, so reads and writes
//! are always typed and an offset is never reinterpreted as a different
//! primitive.

use std::fmt;
use std::marker::PhantomData;

/// A primitive that can be stored in a record.
///
/// Values are encoded big-endian so that records are byte-for-byte the
/// layout of the raw file format.
pub trait Primitive: Copy {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Decode from the first `SIZE` bytes of `bytes`.
    fn read(bytes: &[u8]) -> Self;

    /// Encode into the first `SIZE` bytes of `bytes`.
    fn write(self, bytes: &mut [u8]);
}

macro_rules! impl_primitive {
    ($($t:ty),* $(,)?) => {
        $(
            impl Primitive for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn read(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(&bytes[..Self::SIZE]);
                    <$t>::from_be_bytes(buf)
                }

                fn write(self, bytes: &mut [u8]) {
                    bytes[..Self::SIZE].copy_from_slice(&self.to_be_bytes());
                }
            }
        )*
    };
}

impl_primitive!(u8, i8, i16, u16, i32, u32, i64, u64, f32, f64);

impl Primitive for bool {
    const SIZE: usize = 1;

    fn read(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[0] = u8::from(self);
    }
}

/// A typed field at a fixed byte offset within a record.
pub struct Field<T> {
    offset: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Primitive> Field<T> {
    /// Declare a field starting at `offset` bytes into the record.
    pub const fn new(offset: usize) -> Self {
        Self {
            offset,
            _marker: PhantomData,
        }
    }

    /// Byte offset of the field within its record.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Byte offset one past the end of the field.
    pub const fn end(&self) -> usize {
        self.offset + T::SIZE
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("type", &std::any::type_name::<T>())
            .field("offset", &self.offset)
            .finish()
    }
}

/// Location of an `n`-dimensional `f64` position embedded in a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionLayout {
    offset: usize,
    dims: usize,
}

impl PositionLayout {
    /// A position of `dims` consecutive `f64`s starting at `offset`.
    pub const fn new(offset: usize, dims: usize) -> Self {
        Self { offset, dims }
    }

    /// Number of coordinates.
    pub const fn num_dimensions(&self) -> usize {
        self.dims
    }

    /// The field holding coordinate `d`.
    pub const fn coordinate(&self, d: usize) -> Field<f64> {
        Field::new(self.offset + d * f64::SIZE)
    }

    /// Byte offset one past the last coordinate.
    pub const fn end(&self) -> usize {
        self.offset + self.dims * f64::SIZE
    }
}
