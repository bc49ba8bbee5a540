//! Big-endian byte conversion for FITS payloads.
//!
//! FITS stores all binary data in big-endian (most-significant byte first)
//! order. Payload bytes are first reinterpreted into a properly aligned typed
//! vector with `bytemuck`, then each element is swapped to native order.

use bytemuck::{pod_collect_to_vec, Pod};

/// Numeric types that can be decoded from big-endian FITS payload bytes.
pub trait FromBigEndian: Pod {
    /// Convert a value whose in-memory bytes are big-endian to native order.
    fn from_be_value(self) -> Self;
}

impl FromBigEndian for u8 {
    #[inline]
    fn from_be_value(self) -> Self {
        self
    }
}

impl FromBigEndian for i16 {
    #[inline]
    fn from_be_value(self) -> Self {
        i16::from_be(self)
    }
}

impl FromBigEndian for i32 {
    #[inline]
    fn from_be_value(self) -> Self {
        i32::from_be(self)
    }
}

impl FromBigEndian for i64 {
    #[inline]
    fn from_be_value(self) -> Self {
        i64::from_be(self)
    }
}

impl FromBigEndian for f32 {
    #[inline]
    fn from_be_value(self) -> Self {
        f32::from_bits(u32::from_be(self.to_bits()))
    }
}

impl FromBigEndian for f64 {
    #[inline]
    fn from_be_value(self) -> Self {
        f64::from_bits(u64::from_be(self.to_bits()))
    }
}

/// Decode a buffer of big-endian values into a native-endian vector.
///
/// # Panics
/// Panics if `raw.len()` is not a multiple of the element size.
pub fn decode_be<T: FromBigEndian>(raw: &[u8]) -> Vec<T> {
    let width = core::mem::size_of::<T>();
    assert!(
        raw.len().is_multiple_of(width),
        "buffer length must be a multiple of {width}"
    );
    let mut values: Vec<T> = pod_collect_to_vec(raw);
    for v in &mut values {
        *v = v.from_be_value();
    }
    values
}
