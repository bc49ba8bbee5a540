//! Dense N-dimensional arrays decoded from FITS payloads.
//!
//! Axis 0 is the fastest-varying axis, matching the FITS `NAXIS1` ordering.
//! An element at index `[i0, i1, ..., in]` lives at linear offset
//! `i0 + i1*E0 + i2*E0*E1 + ...` where `Ek` is the extent of axis `k`.

use core::fmt;
use core::ops::{Index, IndexMut};

use crate::endian::FromBigEndian;
use crate::error::{Error, Result};

/// The six element encodings a FITS payload can declare through BITPIX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ElementType {
    /// Map a BITPIX value to its element encoding.
    pub fn from_bitpix(bitpix: i64) -> Result<Self> {
        match bitpix {
            8 => Ok(ElementType::U8),
            16 => Ok(ElementType::I16),
            32 => Ok(ElementType::I32),
            64 => Ok(ElementType::I64),
            -32 => Ok(ElementType::F32),
            -64 => Ok(ElementType::F64),
            other => Err(Error::InvalidBitpix(other)),
        }
    }

    /// The BITPIX value declaring this encoding.
    pub fn bitpix(self) -> i64 {
        match self {
            ElementType::U8 => 8,
            ElementType::I16 => 16,
            ElementType::I32 => 32,
            ElementType::I64 => 64,
            ElementType::F32 => -32,
            ElementType::F64 => -64,
        }
    }

    /// Size of one element in bytes.
    pub fn byte_width(self) -> usize {
        (self.bitpix().unsigned_abs() / 8) as usize
    }

    /// Returns `true` for the IEEE floating-point encodings.
    pub fn is_float(self) -> bool {
        matches!(self, ElementType::F32 | ElementType::F64)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::U8 => "u8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// A numeric type that can back a [`DataArray`].
pub trait Element: FromBigEndian + Default + PartialEq + fmt::Debug + fmt::Display {
    /// The encoding this Rust type corresponds to.
    const TYPE: ElementType;
}

impl Element for u8 {
    const TYPE: ElementType = ElementType::U8;
}
impl Element for i16 {
    const TYPE: ElementType = ElementType::I16;
}
impl Element for i32 {
    const TYPE: ElementType = ElementType::I32;
}
impl Element for i64 {
    const TYPE: ElementType = ElementType::I64;
}
impl Element for f32 {
    const TYPE: ElementType = ElementType::F32;
}
impl Element for f64 {
    const TYPE: ElementType = ElementType::F64;
}

/// Number of elements held by an array with the given extents.
///
/// A rank-0 shape holds no elements.
pub fn element_count(extents: &[usize]) -> Option<usize> {
    if extents.is_empty() {
        return Some(0);
    }
    extents.iter().try_fold(1usize, |acc, &e| acc.checked_mul(e))
}

/// A dense, fixed-size N-dimensional array.
///
/// The backing store is allocated once at construction and never resized.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray<T> {
    extents: Vec<usize>,
    data: Box<[T]>,
}

impl<T: Element> DataArray<T> {
    /// Create a zero-filled array with the given axis extents.
    ///
    /// # Panics
    /// Panics if the product of the extents overflows `usize`.
    pub fn new(extents: impl Into<Vec<usize>>) -> Self {
        let extents = extents.into();
        let count = element_count(&extents).expect("array extents overflow usize");
        DataArray {
            extents,
            data: vec![T::default(); count].into_boxed_slice(),
        }
    }

    /// Wrap already-decoded elements. Fails if `data` does not hold exactly
    /// the product of `extents` elements.
    pub fn from_vec(extents: impl Into<Vec<usize>>, data: Vec<T>) -> Result<Self> {
        let extents = extents.into();
        match element_count(&extents) {
            Some(count) if count == data.len() => Ok(DataArray {
                extents,
                data: data.into_boxed_slice(),
            }),
            _ => Err(Error::InvalidValue {
                keyword: "NAXIS".into(),
                value: shape_string(&extents),
            }),
        }
    }
}

impl<T: Element> DataArray<T> {
    /// The element encoding backing this array.
    pub fn element_type(&self) -> ElementType {
        T::TYPE
    }
}

fn shape_string(extents: &[usize]) -> String {
    extents
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("x")
}

impl<T> DataArray<T> {
    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    /// All axis extents, fastest-varying first.
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Extent of one axis; 0 for an axis beyond the rank.
    pub fn extent(&self, axis: usize) -> usize {
        self.extents.get(axis).copied().unwrap_or(0)
    }

    /// Width of a 2D table: the extent of axis 0.
    pub fn column_count(&self) -> usize {
        self.extent(0)
    }

    /// Height of a 2D table: the extent of axis 1, or 0 below rank 2.
    pub fn row_count(&self) -> usize {
        if self.rank() >= 2 {
            self.extents[1]
        } else {
            0
        }
    }

    /// Flatten an N-dimensional index to a linear offset.
    ///
    /// Missing trailing indices count as 0 and indices beyond the rank are
    /// ignored. The result is not bounds-checked.
    pub fn flatten_index(&self, index: &[usize]) -> usize {
        let mut offset = 0;
        let mut stride = 1;
        for (axis, &extent) in self.extents.iter().enumerate() {
            offset += index.get(axis).copied().unwrap_or(0) * stride;
            stride *= extent;
        }
        offset
    }

    /// Like [`DataArray::flatten_index`], but `None` when the offset does not
    /// fit in `usize`.
    pub fn checked_flatten_index(&self, index: &[usize]) -> Option<usize> {
        let mut offset = 0usize;
        let mut stride = 1usize;
        for (axis, &extent) in self.extents.iter().enumerate() {
            let term = index.get(axis).copied().unwrap_or(0).checked_mul(stride)?;
            offset = offset.checked_add(term)?;
            stride = stride.saturating_mul(extent);
        }
        Some(offset)
    }

    /// Expand a linear offset into one index per axis.
    pub fn unflatten_index(&self, mut offset: usize) -> Vec<usize> {
        let mut index = Vec::with_capacity(self.rank());
        for &extent in &self.extents {
            if extent == 0 {
                index.push(0);
                continue;
            }
            index.push(offset % extent);
            offset /= extent;
        }
        index
    }

    /// The elements in linear order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Element at a linear offset.
    pub fn get(&self, offset: usize) -> Option<&T> {
        self.data.get(offset)
    }

    /// Mutable element at a linear offset.
    pub fn get_mut(&mut self, offset: usize) -> Option<&mut T> {
        self.data.get_mut(offset)
    }

    /// Element at an N-dimensional index.
    pub fn get_at(&self, index: &[usize]) -> Option<&T> {
        self.data.get(self.checked_flatten_index(index)?)
    }

    /// Mutable element at an N-dimensional index.
    pub fn get_at_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        let offset = self.checked_flatten_index(index)?;
        self.data.get_mut(offset)
    }
}

impl<T: fmt::Display> DataArray<T> {
    /// Textual form of the element at `index`, or `None` when the flattened
    /// offset falls outside the array.
    pub fn element_string(&self, index: &[usize]) -> Option<String> {
        self.get_at(index).map(|v| v.to_string())
    }
}

impl<T> Index<usize> for DataArray<T> {
    type Output = T;

    fn index(&self, offset: usize) -> &T {
        &self.data[offset]
    }
}

impl<T> IndexMut<usize> for DataArray<T> {
    fn index_mut(&mut self, offset: usize) -> &mut T {
        &mut self.data[offset]
    }
}

impl<T> Index<&[usize]> for DataArray<T> {
    type Output = T;

    fn index(&self, index: &[usize]) -> &T {
        &self.data[self.flatten_index(index)]
    }
}

impl<T> IndexMut<&[usize]> for DataArray<T> {
    fn index_mut(&mut self, index: &[usize]) -> &mut T {
        let offset = self.flatten_index(index);
        &mut self.data[offset]
    }
}

/// A payload array of one of the six FITS element encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    U8(DataArray<u8>),
    I16(DataArray<i16>),
    I32(DataArray<i32>),
    I64(DataArray<i64>),
    F32(DataArray<f32>),
    F64(DataArray<f64>),
}

macro_rules! dispatch {
    ($self:expr, $arr:ident => $body:expr) => {
        match $self {
            ArrayData::U8($arr) => $body,
            ArrayData::I16($arr) => $body,
            ArrayData::I32($arr) => $body,
            ArrayData::I64($arr) => $body,
            ArrayData::F32($arr) => $body,
            ArrayData::F64($arr) => $body,
        }
    };
}

impl ArrayData {
    /// The element encoding of this array.
    pub fn element_type(&self) -> ElementType {
        dispatch!(self, a => a.element_type())
    }

    pub fn extents(&self) -> &[usize] {
        dispatch!(self, a => a.extents())
    }

    pub fn extent(&self, axis: usize) -> usize {
        dispatch!(self, a => a.extent(axis))
    }

    pub fn rank(&self) -> usize {
        dispatch!(self, a => a.rank())
    }

    pub fn len(&self) -> usize {
        dispatch!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        dispatch!(self, a => a.is_empty())
    }

    pub fn flatten_index(&self, index: &[usize]) -> usize {
        dispatch!(self, a => a.flatten_index(index))
    }

    /// Textual form of the element at `index`, `None` if out of range.
    pub fn element_string(&self, index: &[usize]) -> Option<String> {
        dispatch!(self, a => a.element_string(index))
    }

    /// Payload size in bytes, excluding block padding.
    pub fn byte_len(&self) -> usize {
        self.len() * self.element_type().byte_width()
    }
}
