//! Streaming FITS reader with BMP and TGA image rendering.
//!
//! ```no_run
//! use fits_stream::{decode_file, ImageOptions, ImageView, RasterFormat};
//!
//! let units = decode_file("frame.fits")?;
//! let image = ImageView::from_unit(&units[0], ImageOptions::default())?;
//! std::fs::write("frame.bmp", image.to_bytes(RasterFormat::Bmp)?)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod array;
pub mod block;
pub mod decode;
pub mod endian;
pub mod error;
pub mod header;
pub mod image;
pub mod raster;
pub mod unit;

#[cfg(feature = "ndarray")]
mod ndarray_compat;

pub use array::{ArrayData, DataArray, Element, ElementType};
pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use decode::{decode, decode_bytes, decode_file, Decoder};
pub use error::{Error, ErrorKind, Result};
pub use header::{Header, HeaderValue};
pub use image::{Colour, ColourRamp, ImageOptions, ImageView, ScalingMode};
pub use raster::{encode, encode_bmp, encode_tga, RasterFormat};
pub use unit::{find_by_name, primary, Unit, UnitKind};
