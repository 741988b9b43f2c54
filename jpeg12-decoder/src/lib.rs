#![warn(missing_docs)]

//! Inspects and decodes 12-bit JPEG images, applying the Zen mask an image may
//! carry in an APP3 segment.
mod decode;
mod error;
/// Defines types for decoding images
pub mod image;
mod info;
mod jpeg;
/// JPEG marker codes
pub mod marker;
pub mod mask;
/// Applies a Zen mask to decoded samples
pub mod overlay;
/// Encoder for PGM/PPM images
pub mod ppm;
/// Structured results of info and decode calls
pub mod report;
pub mod scanner;
mod session;

pub use decode::{decode, decode_with_options, DecodeOptions, Jpeg12Decoder, REQUIRED_PRECISION};
pub use error::{Error, Result};
pub use image::{DecodeResult, ImageHeader};
pub use info::get_info;
pub use report::Report;
