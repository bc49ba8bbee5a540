//! Image extraction from decoded units.
//!
//! An [`ImageView`] is a read-only 2D projection of the first payload group
//! of an image unit: every element of the first plane is promoted to `i64`,
//! statistics are gathered, and a display range is chosen by the configured
//! [`ScalingMode`]. Rendering maps each value through a two-colour
//! [`ColourRamp`].

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::array::{ArrayData, DataArray};
use crate::error::{Error, Result};
use crate::unit::Unit;

// ── Colours ──

/// An 8-bit ARGB colour. The default is opaque black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Colour {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const BLACK: Colour = Colour::rgb(0, 0, 0);
    pub const WHITE: Colour = Colour::rgb(255, 255, 255);

    /// An opaque colour.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Colour { a: 255, r, g, b }
    }

    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Colour { a, r, g, b }
    }
}

impl Default for Colour {
    fn default() -> Self {
        Colour::BLACK
    }
}

/// Linear interpolation between two endpoint colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ColourRamp {
    pub start: Colour,
    pub end: Colour,
}

impl ColourRamp {
    /// Black to white.
    pub const BLACK_WHITE: ColourRamp = ColourRamp::new(Colour::BLACK, Colour::WHITE);

    pub const fn new(start: Colour, end: Colour) -> Self {
        ColourRamp { start, end }
    }

    /// The colour at blend factor `t`, clamped to `[0, 1]`.
    ///
    /// Every channel, alpha included, is `(1 - t) * start + t * end`
    /// truncated to a byte.
    pub fn at(&self, t: f64) -> Colour {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        Colour {
            a: lerp(self.start.a, self.end.a, t),
            r: lerp(self.start.r, self.end.r, t),
            g: lerp(self.start.g, self.end.g, t),
            b: lerp(self.start.b, self.end.b, t),
        }
    }
}

impl Default for ColourRamp {
    fn default() -> Self {
        ColourRamp::BLACK_WHITE
    }
}

fn lerp(v0: u8, v1: u8, t: f64) -> u8 {
    ((1.0 - t) * f64::from(v0) + t * f64::from(v1)) as u8
}

// ── Options ──

/// How pixel values are mapped onto the colour ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ScalingMode {
    /// Map `[0, max]` of the element type's range. Values below zero clip to
    /// the start colour, even for signed types.
    #[default]
    Automatic,
    /// Map the observed minimum and maximum of the image.
    DataMinMax,
}

impl FromStr for ScalingMode {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" | "auto" => Ok(ScalingMode::Automatic),
            "data-min-max" | "dataminmax" | "data_min_max" => Ok(ScalingMode::DataMinMax),
            other => Err(format!("unknown scaling mode: {other}")),
        }
    }
}

impl fmt::Display for ScalingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingMode::Automatic => f.write_str("automatic"),
            ScalingMode::DataMinMax => f.write_str("data-min-max"),
        }
    }
}

/// Rendering configuration for [`ImageView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImageOptions {
    pub scaling: ScalingMode,
    pub colours: ColourRamp,
    /// Reserved for rendering undefined pixels. Not used yet.
    pub undefined_pixel_colour: Colour,
}

impl Default for ImageOptions {
    fn default() -> Self {
        ImageOptions {
            scaling: ScalingMode::Automatic,
            colours: ColourRamp::BLACK_WHITE,
            undefined_pixel_colour: Colour::BLACK,
        }
    }
}

// ── Image view ──

/// A 2D view over the first plane of an integer image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageView {
    width: usize,
    height: usize,
    /// Row-major: `pixels[x + y * width]`.
    pixels: Vec<i64>,
    min: i64,
    max: i64,
    scale_min: i64,
    scale_max: i64,
    options: ImageOptions,
}

impl ImageView {
    /// Build an image from the first group of a Primary or Image unit.
    ///
    /// A unit without payload groups yields an empty 0x0 image.
    pub fn from_unit(unit: &Unit, options: ImageOptions) -> Result<Self> {
        if !unit.kind().is_image() {
            return Err(Error::NotAnImage(unit.kind()));
        }
        match unit.data() {
            Some(data) => ImageView::from_array(data, options),
            None => Ok(ImageView::empty(options)),
        }
    }

    /// Build an image from one payload array.
    ///
    /// Only the four integer encodings are supported.
    pub fn from_array(data: &ArrayData, options: ImageOptions) -> Result<Self> {
        if data.rank() < 2 {
            return Err(Error::TooFewAxes(data.rank()));
        }
        let view = match data {
            ArrayData::U8(a) => ImageView::copy_pixels(a, u8::MAX.into(), options),
            ArrayData::I16(a) => ImageView::copy_pixels(a, i16::MAX.into(), options),
            ArrayData::I32(a) => ImageView::copy_pixels(a, i32::MAX.into(), options),
            ArrayData::I64(a) => ImageView::copy_pixels(a, i64::MAX, options),
            ArrayData::F32(_) | ArrayData::F64(_) => {
                return Err(Error::UnsupportedPixelType(data.element_type()))
            }
        };
        debug!(
            width = view.width,
            height = view.height,
            min = view.min,
            max = view.max,
            scaling = %options.scaling,
            "extracted image"
        );
        Ok(view)
    }

    fn empty(options: ImageOptions) -> Self {
        ImageView {
            width: 0,
            height: 0,
            pixels: Vec::new(),
            min: 0,
            max: 0,
            scale_min: 0,
            scale_max: 0,
            options,
        }
    }

    fn copy_pixels<T>(data: &DataArray<T>, type_max: i64, options: ImageOptions) -> Self
    where
        T: Copy + Into<i64>,
    {
        let width = data.extent(0);
        let height = data.extent(1);
        // The first plane is the leading width*height elements. It is absent
        // only when a higher axis has extent zero.
        let plane = width * height;
        if data.len() < plane {
            return ImageView::empty(options);
        }

        let pixels: Vec<i64> = data.as_slice()[..plane]
            .iter()
            .map(|&v| v.into())
            .collect();
        let min = pixels.iter().copied().min().unwrap_or(0);
        let max = pixels.iter().copied().max().unwrap_or(0);

        let (scale_min, scale_max) = match options.scaling {
            ScalingMode::Automatic => (0, type_max),
            ScalingMode::DataMinMax => (min, max),
        };

        ImageView {
            width,
            height,
            pixels,
            min,
            max,
            scale_min,
            scale_max,
            options,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Smallest value in the image, 0 when empty.
    pub fn min_value(&self) -> i64 {
        self.min
    }

    /// Largest value in the image, 0 when empty.
    pub fn max_value(&self) -> i64 {
        self.max
    }

    /// The value mapped to the start of the colour ramp.
    pub fn scale_min(&self) -> i64 {
        self.scale_min
    }

    /// The value mapped to the end of the colour ramp.
    pub fn scale_max(&self) -> i64 {
        self.scale_max
    }

    pub fn options(&self) -> &ImageOptions {
        &self.options
    }

    /// All pixel values, row by row from the top.
    pub fn pixels(&self) -> &[i64] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<i64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[x + y * self.width])
    }

    /// Position of `value` within the display range, clamped to `[0, 1]`.
    ///
    /// A degenerate range maps values at or above it to 1 and the rest to 0.
    pub fn blend_factor(&self, value: i64) -> f64 {
        if self.scale_max == self.scale_min {
            return if value >= self.scale_max { 1.0 } else { 0.0 };
        }
        let span = self.scale_max as f64 - self.scale_min as f64;
        ((value as f64 - self.scale_min as f64) / span).clamp(0.0, 1.0)
    }

    /// Display colour for an arbitrary value.
    pub fn colour_of(&self, value: i64) -> Colour {
        self.options.colours.at(self.blend_factor(value))
    }

    /// Display colour of the pixel at `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinates are outside the image.
    pub fn colour_at(&self, x: usize, y: usize) -> Colour {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} image",
            self.width,
            self.height
        );
        self.colour_of(self.pixels[x + y * self.width])
    }
}
