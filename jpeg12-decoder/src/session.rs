use std::panic::{self, AssertUnwindSafe};

use crate::{
    error::{Error, Result},
    jpeg::{self, source::MemorySource, Decompressor, MarkerHandler},
    marker::JPEGMarker,
};

/// Tag that opens the payload of an APP3 segment carrying a Zen mask.
pub const ZEN_TAG: &[u8] = b"Zen";

/// Keeps a reference to the payload of the first Zen segment.
#[derive(Debug, Default)]
pub struct ZenCapture<'data> {
    chunk: Option<&'data [u8]>,
}

impl<'data> MarkerHandler<'data> for ZenCapture<'data> {
    fn process(&mut self, marker: JPEGMarker, payload: &'data [u8]) -> jpeg::error::Result<()> {
        match payload.strip_prefix(ZEN_TAG) {
            Some(chunk) if self.chunk.is_none() => {
                log::debug!("zen segment in {marker:?}, {} bytes", chunk.len());
                self.chunk = Some(chunk);
            }
            Some(_) => log::debug!("ignoring repeated zen segment"),
            None => log::trace!("skipping {marker:?} segment without zen tag"),
        }
        Ok(())
    }
}

pub type Cinfo<'data> = Decompressor<'data, MemorySource<'data>, ZenCapture<'data>>;

/// One decode call's decompressor, with the boundary that turns its failures
/// into `Error::DecoderFatal`. Dropping the session releases the decompressor.
pub struct DecodeSession<'data> {
    cinfo: Cinfo<'data>,
}

impl<'data> DecodeSession<'data> {
    pub fn new(input: &'data [u8]) -> Self {
        let mut cinfo = Decompressor::new(MemorySource::new(input), ZenCapture::default());
        cinfo.register_marker_processor(JPEGMarker::APP3);
        Self { cinfo }
    }

    /// Runs `call` against the decompressor. Errors and panics raised inside
    /// it come back as `DecoderFatal`.
    pub fn guard<T, F>(&mut self, call: F) -> Result<T>
    where
        F: FnOnce(&mut Cinfo<'data>) -> jpeg::error::Result<T>,
    {
        let cinfo = &mut self.cinfo;
        match panic::catch_unwind(AssertUnwindSafe(|| call(cinfo))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(self.fatal(err.to_string())),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "decoder panicked".to_string());
                Err(self.fatal(message))
            }
        }
    }

    /// A `DecoderFatal` carrying `message` and the first warning seen so far.
    pub fn fatal(&self, message: String) -> Error {
        log::debug!("decoder failed: {message}");
        Error::DecoderFatal {
            message,
            warning: self
                .cinfo
                .error_manager()
                .first_warning()
                .map(|w| w.to_string()),
        }
    }

    pub fn zen_chunk(&self) -> Option<&'data [u8]> {
        self.cinfo.handler().chunk
    }
}
