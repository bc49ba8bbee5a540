use thiserror::Error;

use crate::array::ElementType;
use crate::unit::UnitKind;

/// All errors that can occur while decoding FITS streams or rendering images.
#[derive(Debug, Error)]
pub enum Error {
    /// Structurally invalid header region.
    #[error("invalid FITS header: {0}")]
    InvalidHeader(&'static str),
    /// Premature end of data while reading.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// Unrecognized BITPIX value.
    #[error("invalid BITPIX value: {0}")]
    InvalidBitpix(i64),
    /// A required keyword was not found where the format demands it.
    #[error("missing required keyword: {0}")]
    MissingKeyword(&'static str),
    /// A structural keyword carried a value that is not a usable integer.
    #[error("invalid value for {keyword}: {value:?}")]
    InvalidValue { keyword: String, value: String },
    /// The unit passed to the image extractor does not hold an image.
    #[error("data unit is not an image: {0}")]
    NotAnImage(UnitKind),
    /// Images need at least two axes.
    #[error("images require at least 2 dimensions, found {0}")]
    TooFewAxes(usize),
    /// The image does not fit the size fields of the raster container.
    #[error("image of {width}x{height} pixels is too large for this raster format")]
    ImageTooLarge { width: usize, height: usize },
    /// The operation does not support this element encoding.
    #[error("cannot read images with pixels of type {0}")]
    UnsupportedPixelType(ElementType),
    /// An I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

/// Broad failure categories, used by callers that only care about who is at
/// fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input stream is not valid FITS.
    Format,
    /// The caller passed an unsuitable argument.
    Argument,
    /// The element encoding is not supported by the operation.
    UnsupportedType,
    /// The underlying reader or writer failed.
    Io,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidHeader(_)
            | Error::UnexpectedEof
            | Error::InvalidBitpix(_)
            | Error::MissingKeyword(_)
            | Error::InvalidValue { .. } => ErrorKind::Format,
            Error::NotAnImage(_) | Error::TooFewAxes(_) | Error::ImageTooLarge { .. } => {
                ErrorKind::Argument
            }
            Error::UnsupportedPixelType(_) => ErrorKind::UnsupportedType,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns `true` for errors caused by malformed input.
    pub fn is_format(&self) -> bool {
        self.kind() == ErrorKind::Format
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(e)
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_header() {
        let e = Error::InvalidHeader("empty stream");
        assert_eq!(e.to_string(), "invalid FITS header: empty stream");
    }

    #[test]
    fn display_unexpected_eof() {
        assert_eq!(Error::UnexpectedEof.to_string(), "unexpected end of file");
    }

    #[test]
    fn display_invalid_bitpix() {
        let e = Error::InvalidBitpix(-99);
        assert_eq!(e.to_string(), "invalid BITPIX value: -99");
    }

    #[test]
    fn display_missing_keyword() {
        let e = Error::MissingKeyword("SIMPLE");
        assert_eq!(e.to_string(), "missing required keyword: SIMPLE");
    }

    #[test]
    fn display_invalid_value() {
        let e = Error::InvalidValue {
            keyword: "NAXIS1".into(),
            value: "abc".into(),
        };
        assert_eq!(e.to_string(), "invalid value for NAXIS1: \"abc\"");
    }

    #[test]
    fn display_argument_errors() {
        assert_eq!(
            Error::NotAnImage(UnitKind::BinaryTable).to_string(),
            "data unit is not an image: BINTABLE"
        );
        assert_eq!(
            Error::TooFewAxes(1).to_string(),
            "images require at least 2 dimensions, found 1"
        );
    }

    #[test]
    fn display_unsupported_pixel_type() {
        let e = Error::UnsupportedPixelType(ElementType::F32);
        assert_eq!(e.to_string(), "cannot read images with pixels of type f32");
    }

    #[test]
    fn kind_classification() {
        assert_eq!(Error::UnexpectedEof.kind(), ErrorKind::Format);
        assert_eq!(Error::InvalidBitpix(7).kind(), ErrorKind::Format);
        assert_eq!(Error::MissingKeyword("SIMPLE").kind(), ErrorKind::Format);
        assert_eq!(Error::TooFewAxes(0).kind(), ErrorKind::Argument);
        assert_eq!(
            Error::ImageTooLarge {
                width: 70000,
                height: 1
            }
            .kind(),
            ErrorKind::Argument
        );
        assert_eq!(
            Error::UnsupportedPixelType(ElementType::F64).kind(),
            ErrorKind::UnsupportedType
        );
        assert!(Error::InvalidHeader("x").is_format());
        assert!(!Error::NotAnImage(UnitKind::Table).is_format());
    }

    #[test]
    fn io_eof_maps_to_format_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::UnexpectedEof));
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::other("oops");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert_eq!(e.kind(), ErrorKind::Io);
        assert_eq!(e.to_string(), "I/O error: oops");
    }

    #[test]
    fn std_error_source() {
        use std::error::Error as StdError;

        assert!(Error::UnexpectedEof.source().is_none());
        let e = Error::Io(std::io::Error::other("inner"));
        assert!(e.source().is_some());
    }
}
