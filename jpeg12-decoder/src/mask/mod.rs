//! Bitmap codec for the Zen mask carried in an APP3 segment.
mod bitmask;
pub mod rle;

pub use bitmask::BitMask2D;
