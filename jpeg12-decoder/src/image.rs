use crate::error::Result;

/// Geometry and precision of an image, as declared by its frame header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// The number of channels per pixel
    pub num_components: u8,
    /// Bits per sample, 8 or 12
    pub data_precision: u8,
}

impl ImageHeader {
    /// Number of samples in a fully decoded image, or `None` when that does
    /// not fit in a `usize`.
    pub fn sample_count(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.num_components as usize)
    }

    /// Number of samples in one decoded row.
    pub fn row_stride(&self) -> usize {
        self.width as usize * self.num_components as usize
    }
}

/// What a successful decode reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeResult {
    /// The header the image was decoded with
    pub header: ImageHeader,
    /// Payload size of the Zen mask segment, when the image carried one
    pub zen_chunk_size: Option<usize>,
}

/// Stores a single frame of image data in a simple bitmap form
#[derive(Debug, Default)]
pub struct Bitmap {
    /// The number of channels in the image
    pub channels: u8,
    /// The size of the image
    pub size: (u16, u16),
    /// Bits used by each sample
    pub precision: u8,
    /// Raw samples, row major with channels interleaved
    pub data: Vec<u16>,
}

/// Used to decode an image.
pub trait ImageDecoder<'data> {
    /// Supplies the decoder with the image data
    fn new(image_data: &'data [u8]) -> Self;
    /// Reads the image geometry without decoding
    fn info(&self) -> Result<ImageHeader>;
    /// Decodes the image
    fn decode(&self) -> Result<Bitmap>;
}

/// Used to encode a bitmap to some output format.
pub trait ImageEncoder<'bitmap> {
    /// Supplies the encoder with a raw bitmap to encode.
    fn new(bitmap: &'bitmap Bitmap) -> Self;
    /// Encodes the bitmap and saves the result to a file at the given path.
    fn encode_to_file(&self, path: &str) -> std::io::Result<()>;
}
