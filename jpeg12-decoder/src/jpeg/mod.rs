//! A sequential Huffman JPEG decompressor for 8 and 12 bit data.
//!
//! Used in stages: `read_header`, `start_decompress`, `read_scanlines` until
//! every row is out, then `finish_decompress`. Dropping the decompressor
//! releases it at any stage.
mod bitstream;
pub mod error;
mod header;
mod jpeg_core;
mod jpeg_reader;
pub mod source;

use self::{
    error::{Error, ErrorManager, Result},
    header::{read_misc_marker, HeaderInfo},
    jpeg_core::EntropyDecoder,
    jpeg_reader::JPEGParser,
    source::Source,
};
use crate::marker::JPEGMarker;

/// Receives the payload of every application marker registered with
/// `Decompressor::register_marker_processor`.
pub trait MarkerHandler<'data> {
    /// `payload` is the segment after its length field.
    fn process(&mut self, marker: JPEGMarker, payload: &'data [u8]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    HeaderRead,
    Decompressing,
    Finished,
}

/// Decompresses one image from a `Source`.
pub struct Decompressor<'data, S: Source<'data>, H: MarkerHandler<'data>> {
    reader: JPEGParser<'data, S>,
    err: ErrorManager,
    handler: H,
    registered: Vec<JPEGMarker>,
    header: Option<HeaderInfo>,
    core: Option<EntropyDecoder>,
    output_scanline: usize,
    state: State,
}

impl<'data, S: Source<'data>, H: MarkerHandler<'data>> Decompressor<'data, S, H> {
    pub fn new(src: S, handler: H) -> Self {
        log::trace!("decompressor created");
        Self {
            reader: JPEGParser::new(src),
            err: ErrorManager::default(),
            handler,
            registered: Vec::new(),
            header: None,
            core: None,
            output_scanline: 0,
            state: State::Start,
        }
    }

    /// Routes `marker` segments to the handler instead of skipping them.
    /// Only application markers can be routed.
    pub fn register_marker_processor(&mut self, marker: JPEGMarker) {
        if marker.is_application() && !self.registered.contains(&marker) {
            self.registered.push(marker);
        }
    }

    /// Reads everything up to and including the first scan header.
    pub fn read_header(&mut self) -> Result<()> {
        if self.state != State::Start {
            return Err(Error::BadState("read_header"));
        }
        self.reader.source_mut().init();

        let header = HeaderInfo::read_header_info(
            &mut self.reader,
            &mut self.err,
            &mut self.handler,
            &self.registered,
        )?;
        log::debug!(
            "frame {}x{}, {} components, {} bit, restart interval {}",
            header.frame_info.image_size.0,
            header.frame_info.image_size.1,
            header.frame_info.components.len(),
            header.frame_info.precision,
            header.restart_interval
        );

        self.header = Some(header);
        self.state = State::HeaderRead;
        Ok(())
    }

    pub fn image_width(&self) -> u16 {
        self.header.as_ref().map_or(0, |h| h.frame_info.image_size.0)
    }

    pub fn image_height(&self) -> u16 {
        self.header.as_ref().map_or(0, |h| h.frame_info.image_size.1)
    }

    pub fn num_components(&self) -> u8 {
        self.header
            .as_ref()
            .map_or(0, |h| h.frame_info.components.len() as u8)
    }

    pub fn data_precision(&self) -> u8 {
        self.header.as_ref().map_or(0, |h| h.frame_info.precision)
    }

    pub fn progressive_mode(&self) -> bool {
        self.header
            .as_ref()
            .is_some_and(|h| h.frame_info.progressive)
    }

    pub fn arith_code(&self) -> bool {
        self.header.as_ref().is_some_and(|h| h.frame_info.arith_code)
    }

    pub fn has_multiple_scans(&self) -> bool {
        self.header.as_ref().is_some_and(|h| h.has_multiple_scans())
    }

    /// Prepares the entropy decoder. Only single scan Huffman images get
    /// past this point.
    pub fn start_decompress(&mut self) -> Result<()> {
        let header = match (&self.header, self.state) {
            (Some(header), State::HeaderRead) => header,
            _ => return Err(Error::BadState("start_decompress")),
        };
        if header.frame_info.arith_code {
            return Err(Error::NotCompiled("Arithmetic coding"));
        }
        if header.frame_info.progressive {
            return Err(Error::NotCompiled("Progressive JPEG"));
        }
        if header.has_multiple_scans() {
            return Err(Error::NotCompiled("Multi-scan JPEG"));
        }

        self.core = Some(EntropyDecoder::new(header)?);
        self.output_scanline = 0;
        self.state = State::Decompressing;
        Ok(())
    }

    /// Rows handed out so far.
    pub fn output_scanline(&self) -> usize {
        self.output_scanline
    }

    pub fn output_height(&self) -> usize {
        self.image_height() as usize
    }

    /// Samples in one output row.
    pub fn row_stride(&self) -> usize {
        self.image_width() as usize * self.num_components() as usize
    }

    /// Decodes as many whole rows as fit in `rows`, never past the last row
    /// of the image. Returns the number of rows written.
    pub fn read_scanlines(&mut self, rows: &mut [u16]) -> Result<usize> {
        if self.state != State::Decompressing {
            return Err(Error::BadState("read_scanlines"));
        }
        let stride = self.row_stride();
        if stride == 0 {
            return Ok(0);
        }
        let lines = (rows.len() / stride).min(self.output_height() - self.output_scanline);

        let core = self
            .core
            .as_mut()
            .ok_or(Error::BadState("read_scanlines"))?;
        for row in rows.chunks_exact_mut(stride).take(lines) {
            core.read_scanline(&mut self.reader, &mut self.err, row)?;
        }
        self.output_scanline += lines;
        Ok(lines)
    }

    /// Reads the rest of the stream up to EOI once every row is out.
    pub fn finish_decompress(&mut self) -> Result<()> {
        if self.state != State::Decompressing || self.output_scanline < self.output_height() {
            return Err(Error::BadState("finish_decompress"));
        }

        loop {
            let code = self.reader.read_next_marker(&mut self.err)?;
            let marker = JPEGMarker::from_code(code).ok_or(Error::UnknownMarker(code))?;
            match marker {
                JPEGMarker::EOI => break,
                JPEGMarker::SOS => return Err(Error::EoiExpected),
                JPEGMarker::SOI => return Err(Error::DuplicateSoi),
                m if m.is_start_of_frame() => return Err(Error::DuplicateSof),
                JPEGMarker::DHT | JPEGMarker::DQT | JPEGMarker::DRI => {
                    self.reader.skip_marker_with_length()?
                }
                m => read_misc_marker(&mut self.reader, m, &mut self.handler, &self.registered)?,
            }
        }

        self.reader.source_mut().term();
        self.core = None;
        self.state = State::Finished;
        log::debug!("decompression finished, {} warnings", self.err.num_warnings());
        Ok(())
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn error_manager(&self) -> &ErrorManager {
        &self.err
    }
}

impl<'data, S: Source<'data>, H: MarkerHandler<'data>> Drop for Decompressor<'data, S, H> {
    fn drop(&mut self) {
        log::trace!("decompressor released in state {:?}", self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::source::MemorySource;

    impl<'data> MarkerHandler<'data> for () {
        fn process(&mut self, _marker: JPEGMarker, _payload: &'data [u8]) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Collect<'data>(Vec<(JPEGMarker, &'data [u8])>);

    impl<'data> MarkerHandler<'data> for Collect<'data> {
        fn process(&mut self, marker: JPEGMarker, payload: &'data [u8]) -> Result<()> {
            self.0.push((marker, payload));
            Ok(())
        }
    }

    /// A flat 8x8 grey image: every coefficient is zero.
    fn flat_image() -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend([0xFF, 0xE3, 0x00, 0x07, b'Z', b'e', b'n', 0xAA, 0xBB]);
        data.extend([0xFF, 0xDB, 0x00, 0x43, 0x00]);
        data.extend([1u8; 64]);
        data.extend([0xFF, 0xC1, 0x00, 0x0B, 12, 0, 8, 0, 8, 1, 1, 0x11, 0]);
        for class in [0x00, 0x10] {
            data.extend([0xFF, 0xC4, 0x00, 0x14, class, 1]);
            data.extend([0u8; 15]);
            data.push(0x00);
        }
        data.extend([0xFF, 0xDA, 0x00, 0x08, 1, 1, 0x00, 0, 63, 0]);
        data.push(0b0011_1111);
        data.extend([0xFF, 0xD9]);
        data
    }

    #[test]
    fn decodes_flat_image() {
        let data = flat_image();
        let mut cinfo = Decompressor::new(MemorySource::new(&data), Collect::default());
        cinfo.register_marker_processor(JPEGMarker::APP3);
        cinfo.read_header().unwrap();
        assert_eq!((cinfo.image_width(), cinfo.image_height()), (8, 8));
        assert_eq!(cinfo.num_components(), 1);
        assert_eq!(cinfo.data_precision(), 12);
        assert!(!cinfo.progressive_mode());
        assert!(!cinfo.arith_code());
        assert!(!cinfo.has_multiple_scans());
        assert_eq!(cinfo.handler().0, vec![(JPEGMarker::APP3, &data[6..11])]);

        cinfo.start_decompress().unwrap();
        let mut samples = vec![0u16; 64];
        assert_eq!(cinfo.read_scanlines(&mut samples[..24]).unwrap(), 3);
        assert_eq!(cinfo.output_scanline(), 3);
        assert_eq!(
            cinfo.finish_decompress(),
            Err(Error::BadState("finish_decompress"))
        );
        assert_eq!(cinfo.read_scanlines(&mut samples[24..]).unwrap(), 5);
        assert_eq!(cinfo.read_scanlines(&mut samples[..8]).unwrap(), 0);
        cinfo.finish_decompress().unwrap();
        assert!(samples.iter().all(|&s| s == 2048));
        assert_eq!(cinfo.error_manager().num_warnings(), 0);
    }

    #[test]
    fn unregistered_markers_are_skipped() {
        let data = flat_image();
        let mut cinfo = Decompressor::new(MemorySource::new(&data), Collect::default());
        cinfo.register_marker_processor(JPEGMarker::COM);
        cinfo.read_header().unwrap();
        assert!(cinfo.handler().0.is_empty());
    }

    #[test]
    fn calls_out_of_order() {
        let data = flat_image();
        let mut cinfo = Decompressor::new(MemorySource::new(&data), ());
        assert_eq!(
            cinfo.start_decompress(),
            Err(Error::BadState("start_decompress"))
        );
        assert_eq!(
            cinfo.read_scanlines(&mut [0; 8]),
            Err(Error::BadState("read_scanlines"))
        );
        cinfo.read_header().unwrap();
        assert_eq!(cinfo.read_header(), Err(Error::BadState("read_header")));
    }

    #[test]
    fn missing_tables() {
        let mut data = flat_image();
        // Point the scan at DC table 1
        let sos = data.len() - 7;
        data[sos] = 0x10;
        let mut cinfo = Decompressor::new(MemorySource::new(&data), ());
        cinfo.read_header().unwrap();
        assert_eq!(cinfo.start_decompress(), Err(Error::NoHuffTable(1)));
    }

    #[test]
    fn second_scan_is_rejected() {
        let mut data = flat_image();
        let eoi = data.len() - 2;
        let sos: Vec<u8> = data[eoi - 11..eoi].to_vec();
        data.splice(eoi..eoi, sos);
        let mut cinfo = Decompressor::new(MemorySource::new(&data), ());
        cinfo.read_header().unwrap();
        cinfo.start_decompress().unwrap();
        cinfo.read_scanlines(&mut [0; 64]).unwrap();
        assert_eq!(cinfo.finish_decompress(), Err(Error::EoiExpected));
    }

    #[test]
    fn rejects_non_jpeg() {
        let data = [0x89, 0x50, 0x4E, 0x47];
        let mut cinfo = Decompressor::new(MemorySource::new(&data), ());
        assert_eq!(cinfo.read_header(), Err(Error::NotJpeg(0x89, 0x50)));
    }
}
