use crate::{
    error::{Error, Result},
    image::{Bitmap, DecodeResult, ImageDecoder, ImageHeader},
    overlay, scanner,
    session::DecodeSession,
};

/// Precision, in bits, of the only images `decode` accepts.
pub const REQUIRED_PRECISION: u8 = 12;

/// Tunes a decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Rows requested from the decompressor per call, 1 or 2. Other values
    /// are clamped.
    pub scanlines_per_read: usize,
    /// Applies the Zen mask when the image carries one. The chunk size is
    /// reported either way.
    pub apply_zen_mask: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            scanlines_per_read: 2,
            apply_zen_mask: true,
        }
    }
}

/// Decodes a 12-bit JPEG into `output`, which must hold exactly
/// `width * height * num_components` samples.
///
/// Nothing is written to `output` unless the image is known to be decodable.
pub fn decode(input: &[u8], output: &mut [u16]) -> Result<DecodeResult> {
    decode_with_options(input, output, &DecodeOptions::default())
}

/// Same as [`decode`], with explicit options.
pub fn decode_with_options(
    input: &[u8],
    output: &mut [u16],
    options: &DecodeOptions,
) -> Result<DecodeResult> {
    let header = scanner::scan(input)?;
    check_output(&header, output.len())?;

    let zen_chunk = decompress(input, &header, output, options)?;

    let zen_chunk_size = match zen_chunk {
        Some(chunk) => {
            if options.apply_zen_mask {
                overlay::apply(chunk, &header, output)?;
            }
            Some(chunk.len())
        }
        None => None,
    };

    Ok(DecodeResult {
        header,
        zen_chunk_size,
    })
}

fn check_output(header: &ImageHeader, samples: usize) -> Result<()> {
    let expected = header.sample_count().and_then(|count| count.checked_mul(2));
    let actual = samples.saturating_mul(2);
    match expected {
        Some(expected) if expected == actual && header.data_precision == REQUIRED_PRECISION => {
            Ok(())
        }
        expected => Err(Error::OutputSizeMismatch {
            header: *header,
            expected: expected.unwrap_or(usize::MAX),
            actual,
        }),
    }
}

/// Runs the decompressor over `input`, writing rows straight into `output`.
/// Returns the Zen segment payload, if the image had one.
fn decompress<'data>(
    input: &'data [u8],
    header: &ImageHeader,
    output: &mut [u16],
    options: &DecodeOptions,
) -> Result<Option<&'data [u8]>> {
    let mut session = DecodeSession::new(input);

    session.guard(|cinfo| cinfo.read_header())?;
    let (multiple_scans, progressive, arith_code, precision) = session.guard(|cinfo| {
        Ok((
            cinfo.has_multiple_scans(),
            cinfo.progressive_mode(),
            cinfo.arith_code(),
            cinfo.data_precision(),
        ))
    })?;
    if arith_code {
        return Err(Error::UnsupportedVariant("arithmetic coding"));
    }
    if multiple_scans {
        let variant = if progressive { "progressive" } else { "multiple scans" };
        return Err(Error::UnsupportedVariant(variant));
    }
    if precision != REQUIRED_PRECISION {
        return Err(Error::PrecisionMismatch(precision));
    }

    session.guard(|cinfo| cinfo.start_decompress())?;

    let stride = header.row_stride();
    let height = header.height as usize;
    let per_read = options.scanlines_per_read.clamp(1, 2);
    loop {
        let row = session.guard(|cinfo| Ok(cinfo.output_scanline()))?;
        if row >= height {
            break;
        }
        let end = (row + per_read).min(height);
        let rows = &mut output[row * stride..end * stride];
        if session.guard(|cinfo| cinfo.read_scanlines(rows))? == 0 {
            return Err(session.fatal(format!("No scanlines returned at row {row}")));
        }
    }

    session.guard(|cinfo| cinfo.finish_decompress())?;
    Ok(session.zen_chunk())
}

/// Decodes 12-bit JPEG images into owned bitmaps.
pub struct Jpeg12Decoder<'data> {
    image_data: &'data [u8],
}

impl<'data> ImageDecoder<'data> for Jpeg12Decoder<'data> {
    fn new(image_data: &'data [u8]) -> Self {
        Self { image_data }
    }

    fn info(&self) -> Result<ImageHeader> {
        scanner::scan(self.image_data)
    }

    fn decode(&self) -> Result<Bitmap> {
        let header = self.info()?;
        // An image too large to address gets an empty buffer, which `decode` refuses
        let mut data = vec![0u16; header.sample_count().unwrap_or(0)];
        decode(self.image_data, &mut data)?;
        Ok(Bitmap {
            channels: header.num_components,
            size: (header.width, header.height),
            precision: header.data_precision,
            data,
        })
    }
}
