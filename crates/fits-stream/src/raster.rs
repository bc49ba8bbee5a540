//! Uncompressed 24-bit BMP and TGA encoders for [`ImageView`].
//!
//! Both formats store pixels as blue, green, red triples. Alpha is dropped.

use core::fmt;
use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::debug;

use crate::error::{Error, Result};
use crate::image::ImageView;

const BMP_FILE_HEADER_LEN: u32 = 14;
const BMP_INFO_HEADER_LEN: u32 = 40;
const BITS_PER_PIXEL: u8 = 24;

/// TGA image type 2: uncompressed true-colour.
const TGA_TRUE_COLOUR: u8 = 2;
/// TGA descriptor bit 5: first row is the top row.
const TGA_TOP_LEFT_ORIGIN: u8 = 0x20;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterFormat {
    Bmp,
    Tga,
}

impl RasterFormat {
    /// Pick a format from a file extension, ignoring case and a leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        if ext.eq_ignore_ascii_case("bmp") {
            Some(RasterFormat::Bmp)
        } else if ext.eq_ignore_ascii_case("tga") {
            Some(RasterFormat::Tga)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Bmp => "bmp",
            RasterFormat::Tga => "tga",
        }
    }
}

impl fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encode `image` in the given format.
pub fn encode<W: Write>(format: RasterFormat, image: &ImageView, sink: &mut W) -> Result<()> {
    match format {
        RasterFormat::Bmp => encode_bmp(image, sink),
        RasterFormat::Tga => encode_tga(image, sink),
    }
}

/// Write `image` as a bottom-up 24-bit BMP.
///
/// The file-size field is left at zero and rows carry no 4-byte alignment
/// padding.
pub fn encode_bmp<W: Write>(image: &ImageView, sink: &mut W) -> Result<()> {
    let too_large = || Error::ImageTooLarge {
        width: image.width(),
        height: image.height(),
    };
    let width = i32::try_from(image.width()).map_err(|_| too_large())?;
    let height = i32::try_from(image.height()).map_err(|_| too_large())?;
    debug!(width, height, "encoding BMP");

    // File header.
    sink.write_all(b"BM")?;
    sink.write_u32::<LittleEndian>(0)?;
    sink.write_u16::<LittleEndian>(0)?;
    sink.write_u16::<LittleEndian>(0)?;
    sink.write_u32::<LittleEndian>(BMP_FILE_HEADER_LEN + BMP_INFO_HEADER_LEN)?;

    // BITMAPINFOHEADER.
    sink.write_u32::<LittleEndian>(BMP_INFO_HEADER_LEN)?;
    sink.write_i32::<LittleEndian>(width)?;
    sink.write_i32::<LittleEndian>(height)?;
    sink.write_u16::<LittleEndian>(1)?;
    sink.write_u16::<LittleEndian>(BITS_PER_PIXEL.into())?;
    // Compression, image size, X/Y resolution, palette counts.
    for _ in 0..6 {
        sink.write_u32::<LittleEndian>(0)?;
    }

    let mut row = Vec::with_capacity(image.width() * 3);
    for y in (0..image.height()).rev() {
        write_bgr_row(image, y, &mut row);
        sink.write_all(&row)?;
    }
    Ok(())
}

/// Write `image` as a top-down uncompressed 24-bit TGA.
pub fn encode_tga<W: Write>(image: &ImageView, sink: &mut W) -> Result<()> {
    let too_large = || Error::ImageTooLarge {
        width: image.width(),
        height: image.height(),
    };
    let width = u16::try_from(image.width()).map_err(|_| too_large())?;
    let height = u16::try_from(image.height()).map_err(|_| too_large())?;
    debug!(width, height, "encoding TGA");

    // ID length, colour map type, image type.
    sink.write_all(&[0, 0, TGA_TRUE_COLOUR])?;
    // Colour map specification and X/Y origin.
    sink.write_all(&[0; 9])?;
    sink.write_u16::<LittleEndian>(width)?;
    sink.write_u16::<LittleEndian>(height)?;
    sink.write_all(&[BITS_PER_PIXEL, TGA_TOP_LEFT_ORIGIN])?;

    let mut row = Vec::with_capacity(image.width() * 3);
    for y in 0..image.height() {
        write_bgr_row(image, y, &mut row);
        sink.write_all(&row)?;
    }
    Ok(())
}

fn write_bgr_row(image: &ImageView, y: usize, row: &mut Vec<u8>) {
    row.clear();
    for x in 0..image.width() {
        let c = image.colour_at(x, y);
        row.extend_from_slice(&[c.b, c.g, c.r]);
    }
}

impl ImageView {
    /// Encode into an in-memory buffer.
    pub fn to_bytes(&self, format: RasterFormat) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        encode(format, self, &mut out)?;
        Ok(out)
    }
}
