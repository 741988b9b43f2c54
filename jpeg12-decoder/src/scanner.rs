//! Frame header lookup over the raw marker structure.
//!
//! Walks segments from SOI up to the first SOF0/SOF1 without touching
//! entropy-coded data, so the geometry is known before a decoder is built.

use byteorder::{BigEndian, ByteOrder};

use crate::{
    error::{Error, Result},
    image::ImageHeader,
    marker::JPEGMarker,
};

/// Smallest input worth looking at.
pub const MIN_INPUT_LEN: usize = 10;

/// Length field plus precision, height, width and component count.
const FRAME_HEADER_FIXED_LEN: usize = 8;

/// Finds the first baseline or extended-sequential frame header and returns
/// the geometry it declares. Never reads outside `data`.
pub fn scan(data: &[u8]) -> Result<ImageHeader> {
    if data.len() < MIN_INPUT_LEN {
        return Err(Error::InsufficientData);
    }
    if data[0] != 0xFF || data[1] != JPEGMarker::SOI.code() {
        return Err(Error::NotThisFormat);
    }

    let mut pos = 2;
    while pos < data.len() {
        let byte = data[pos];
        pos += 1;
        if byte != 0xFF {
            continue;
        }
        if pos >= data.len() {
            return Err(Error::TruncatedMarker("Not enough data for marker"));
        }

        let code = data[pos];
        if code == 0xFF {
            // Fill byte, the next 0xFF may still prefix a marker
            continue;
        }
        pos += 1;

        let marker = match JPEGMarker::from_code(code) {
            Some(marker) => marker,
            // Stuffed zero or reserved code, literal data
            None => continue,
        };

        match marker {
            JPEGMarker::EOI => return Err(Error::PrematureEnd),
            JPEGMarker::SOS => return Err(Error::FrameHeaderMissing),
            m if m.is_standalone() => continue,
            JPEGMarker::SOF0 | JPEGMarker::SOF1 => return read_frame_header(data, pos),
            _ => {
                let length = segment_length(data, pos)?;
                if length < 2 {
                    return Err(Error::InvalidSegmentLength("Invalid segment size"));
                }
                if length > data.len() - pos {
                    return Err(Error::TruncatedSegment("Not enough data for segment"));
                }
                pos += length;
            }
        }
    }

    Err(Error::FrameHeaderMissing)
}

fn segment_length(data: &[u8], pos: usize) -> Result<usize> {
    if data.len() - pos < 2 {
        return Err(Error::TruncatedMarker("Not enough data for segment size"));
    }
    Ok(BigEndian::read_u16(&data[pos..]) as usize)
}

/// `pos` is the offset of the length field, right after the SOF marker.
fn read_frame_header(data: &[u8], pos: usize) -> Result<ImageHeader> {
    let length = segment_length(data, pos)?;
    if length > data.len() - pos {
        return Err(Error::TruncatedSegment("Not enough data for header segment"));
    }
    if length < FRAME_HEADER_FIXED_LEN {
        return Err(Error::InvalidSegmentLength("Invalid header segment size"));
    }

    let segment = &data[pos + 2..pos + length];
    let header = ImageHeader {
        data_precision: segment[0],
        height: BigEndian::read_u16(&segment[1..3]),
        width: BigEndian::read_u16(&segment[3..5]),
        num_components: segment[5],
    };

    if length != FRAME_HEADER_FIXED_LEN + 3 * header.num_components as usize {
        return Err(Error::InvalidSegmentLength("Invalid header segment size"));
    }

    log::debug!(
        "frame header: {}x{}, {} components, {} bits",
        header.width,
        header.height,
        header.num_components,
        header.data_precision
    );
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    static TEST_HEADER: [u8; 28] = [
        0xFF, 0xD8,     // Start of image
        0xFF, 0xFE,     // Comment
        0, 3,           // Length
        65,             // Content
        0xFF, 0xC1,     // Start of frame, extended sequential
        0, 17,          // Length
        12,             // Precision
        0, 128,         // Height
        0, 64,          // Width
        3,              // Component count
        1, 0x11, 0,
        2, 0x11, 0,
        3, 0x11, 0,     // Component data
        0xFF, 0xD9,     // Trailing bytes
    ];

    #[test]
    fn reads_frame_header() {
        let header = scan(&TEST_HEADER).unwrap();
        assert_eq!(
            header,
            ImageHeader {
                width: 64,
                height: 128,
                num_components: 3,
                data_precision: 12,
            }
        );
    }

    #[test]
    fn short_input() {
        for len in 0..MIN_INPUT_LEN {
            assert_eq!(scan(&TEST_HEADER[..len]), Err(Error::InsufficientData));
        }
    }

    #[test]
    fn not_a_jpeg() {
        let mut data = TEST_HEADER;
        data[1] = 0xD9;
        assert_eq!(scan(&data), Err(Error::NotThisFormat));
        data[0] = 0x89;
        data[1] = 0xD8;
        assert_eq!(scan(&data), Err(Error::NotThisFormat));
    }

    #[test]
    fn length_must_match_components() {
        for delta in [-1i32, 1] {
            let mut data = TEST_HEADER;
            data[10] = (17 + delta) as u8;
            assert!(matches!(scan(&data), Err(Error::InvalidSegmentLength(_))));
        }
    }

    #[test]
    fn end_of_image_before_frame() {
        let data = [0xFF, 0xD8, 0xFF, 0xD0, 0x12, 0xFF, 0x00, 0xFF, 0xD9, 0x00];
        assert_eq!(scan(&data), Err(Error::PrematureEnd));
    }

    #[test]
    fn scan_before_frame() {
        let data = [0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x08, 0, 0, 0, 0, 0, 0];
        assert_eq!(scan(&data), Err(Error::FrameHeaderMissing));
    }

    #[test]
    fn no_frame_at_all() {
        let data = [0xFF, 0xD8, 0xFF, 0xFE, 0x00, 0x04, 1, 2, 3, 4, 5, 6];
        assert_eq!(scan(&data), Err(Error::FrameHeaderMissing));
    }

    #[test]
    fn truncated_marker() {
        let data = [0xFF, 0xD8, 1, 2, 3, 4, 5, 6, 7, 0xFF];
        assert!(matches!(scan(&data), Err(Error::TruncatedMarker(_))));

        let data = [0xFF, 0xD8, 1, 2, 3, 4, 5, 6, 0xFF, 0xE0, 0x00];
        assert!(matches!(scan(&data), Err(Error::TruncatedMarker(_))));
    }

    #[test]
    fn truncated_segment() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x01, 0x00, 1, 2, 3, 4];
        assert!(matches!(scan(&data), Err(Error::TruncatedSegment(_))));

        let data = &TEST_HEADER[..20];
        assert!(matches!(scan(data), Err(Error::TruncatedSegment(_))));
    }

    #[test]
    fn zero_length_segment() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x00, 1, 2, 3, 4];
        assert!(matches!(scan(&data), Err(Error::InvalidSegmentLength(_))));
    }

    #[test]
    fn fill_bytes_before_marker() {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xFF, 0xFF];
        data.extend_from_slice(&TEST_HEADER[7..]);
        assert_eq!(scan(&data).unwrap().width, 64);
    }

    #[test]
    fn progressive_frame_is_not_a_frame_header() {
        let mut data = TEST_HEADER;
        data[8] = 0xC2;
        assert_eq!(scan(&data), Err(Error::PrematureEnd));
    }

    #[test]
    fn never_panics_on_prefixes() {
        let mut data = TEST_HEADER.to_vec();
        data.extend_from_slice(&[0xFF, 0xE3, 0xFF, 0xFF, 0xFF, 0x00, 0xFF]);
        for end in 0..data.len() {
            let _ = scan(&data[..end]);
            for start in 0..end {
                let _ = scan(&data[start..end]);
            }
        }
    }
}
