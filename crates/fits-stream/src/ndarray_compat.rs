//! Conversion of payload arrays into `ndarray` arrays.
//!
//! FITS stores the first axis fastest, so the resulting arrays use column-major
//! (Fortran) layout and keep the FITS axis order: `arr[[x, y]]` addresses the
//! same element as `DataArray::get_at(&[x, y])`.

use ndarray::{Array, ArrayD, IxDyn, ShapeBuilder};

use crate::array::{DataArray, Element};
use crate::error::{Error, Result};

impl<T: Element> DataArray<T> {
    /// Copy the elements into an owned `ndarray` array of the same shape.
    ///
    /// A rank-0 array becomes an empty one-dimensional array.
    pub fn to_ndarray(&self) -> Result<ArrayD<T>> {
        let extents: Vec<usize> = if self.rank() == 0 {
            vec![0]
        } else {
            self.extents().to_vec()
        };
        Array::from_shape_vec(IxDyn(&extents).f(), self.as_slice().to_vec()).map_err(|e| {
            Error::InvalidValue {
                keyword: "NAXIS".into(),
                value: e.to_string(),
            }
        })
    }
}
