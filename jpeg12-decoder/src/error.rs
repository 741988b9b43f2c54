use std::fmt;

use crate::image::ImageHeader;

/// Result of every fallible call in this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Describes why an image could not be inspected or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The input is shorter than any JPEG stream could be.
    InsufficientData,
    /// The input does not start with an SOI marker.
    NotThisFormat,
    /// An EOI marker showed up before the frame header.
    PrematureEnd,
    /// No SOF0/SOF1 frame header precedes the first scan or the end of data.
    FrameHeaderMissing,
    /// A marker or its length field is cut off by the end of the input.
    TruncatedMarker(&'static str),
    /// A segment claims more bytes than the input holds.
    TruncatedSegment(&'static str),
    /// A segment length field is inconsistent with its content.
    InvalidSegmentLength(&'static str),
    /// The output buffer does not fit a 12-bit image of the parsed geometry.
    OutputSizeMismatch {
        /// The header parsed from the input
        header: ImageHeader,
        /// Bytes a 12-bit decode of that header needs
        expected: usize,
        /// Bytes the caller supplied
        actual: usize,
    },
    /// The stream is progressive, multi-scan or arithmetic coded.
    UnsupportedVariant(&'static str),
    /// The decoder reports a precision other than 12 bits.
    PrecisionMismatch(u8),
    /// The decoder gave up. Carries its message and the first warning it raised.
    DecoderFatal {
        /// Formatted decoder message
        message: String,
        /// First warning seen before the failure
        warning: Option<String>,
    },
    /// The Zen segment does not decode to a mask of the image's size.
    MaskCorrupt(&'static str),
}

impl Error {
    /// Header fields known at the time of failure, so the caller can size a retry.
    pub fn header(&self) -> Option<&ImageHeader> {
        match self {
            Error::OutputSizeMismatch { header, .. } => Some(header),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InsufficientData => write!(f, "Not enough input data"),
            Error::NotThisFormat => write!(f, "Not a JPEG file"),
            Error::PrematureEnd => write!(f, "Found end of image too early"),
            Error::FrameHeaderMissing => write!(f, "No start of frame found"),
            Error::TruncatedMarker(msg) => write!(f, "{msg}"),
            Error::TruncatedSegment(msg) => write!(f, "{msg}"),
            Error::InvalidSegmentLength(msg) => write!(f, "{msg}"),
            Error::OutputSizeMismatch {
                header,
                expected,
                actual,
            } => {
                if header.data_precision != 12 {
                    write!(
                        f,
                        "Output buffer size mismatch: JPEG data precision is {} bits, expected 12",
                        header.data_precision
                    )
                } else {
                    write!(
                        f,
                        "Output buffer size mismatch: need {expected} bytes, got {actual}"
                    )
                }
            }
            Error::UnsupportedVariant(msg) => write!(f, "JPEG type not supported: {msg}"),
            Error::PrecisionMismatch(precision) => {
                write!(f, "JPEG data precision not 12 bits ({precision})")
            }
            Error::DecoderFatal { message, warning } => match warning {
                Some(warning) => write!(f, "{message} (after warning: {warning})"),
                None => write!(f, "{message}"),
            },
            Error::MaskCorrupt(msg) => write!(f, "Corrupt Zen mask: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
