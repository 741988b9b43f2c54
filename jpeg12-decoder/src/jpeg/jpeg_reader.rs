use byteorder::{BigEndian, ByteOrder};
use std::marker::PhantomData;

use super::{
    error::{Error, ErrorManager, Result, Warning},
    source::Source,
};
use crate::marker::JPEGMarker;

/// Reads bytes, words and markers out of a `Source`.
pub struct JPEGParser<'data, S> {
    src: S,
    position: u64,
    unread_marker: Option<u8>,
    _data: PhantomData<&'data [u8]>,
}

impl<'data, S: Source<'data>> JPEGParser<'data, S> {
    pub fn new(src: S) -> Self {
        Self {
            src,
            position: 0,
            unread_marker: None,
            _data: PhantomData,
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.src
    }

    fn ensure(&mut self, count: usize) -> Result<()> {
        while self.src.bytes().len() < count {
            self.src.fill()?;
        }
        Ok(())
    }

    pub fn read_next_byte(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let byte = self.src.bytes()[0];
        self.src.consume(1);
        self.position += 1;
        Ok(byte)
    }

    pub fn read_next_word(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let word = BigEndian::read_u16(self.src.bytes());
        self.src.consume(2);
        self.position += 2;
        Ok(word)
    }

    /// Borrows the next `count` bytes straight from the source.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'data [u8]> {
        self.ensure(count)?;
        let bytes = &self.src.bytes()[..count];
        self.src.consume(count);
        self.position += count as u64;
        Ok(bytes)
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.src.skip(count)?;
        self.position += count as u64;
        Ok(())
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Reads a segment length field and returns the payload size that follows it.
    pub fn read_segment_length(&mut self) -> Result<usize> {
        let length = self.read_next_word()?;
        if length < 2 {
            return Err(Error::BadLength(length));
        }
        Ok(length as usize - 2)
    }

    pub fn skip_marker_with_length(&mut self) -> Result<()> {
        let length = self.read_segment_length()?;
        self.skip(length)
    }

    /// The stream has to open with SOI, with nothing in front of it.
    pub fn read_first_marker(&mut self) -> Result<()> {
        let first = self.read_next_byte()?;
        let second = self.read_next_byte()?;
        if first != 0xFF || second != JPEGMarker::SOI.code() {
            return Err(Error::NotJpeg(first, second));
        }
        Ok(())
    }

    /// Finds the next marker code, skipping fill bytes and warning about any
    /// garbage in front of it.
    pub fn read_next_marker(&mut self, err: &mut ErrorManager) -> Result<u8> {
        if let Some(code) = self.unread_marker.take() {
            return Ok(code);
        }

        let mut discarded = 0;
        let code = loop {
            let mut byte = self.read_next_byte()?;
            while byte != 0xFF {
                discarded += 1;
                byte = self.read_next_byte()?;
            }

            let mut code = self.read_next_byte()?;
            while code == 0xFF {
                code = self.read_next_byte()?;
            }
            if code != 0 {
                break code;
            }
            // A stuffed zero is data, not a marker
            discarded += 2;
        };

        if discarded > 0 {
            err.warn(Warning::ExtraneousData {
                count: discarded,
                marker: code,
            });
        }
        Ok(code)
    }

    /// Hands a marker found inside entropy-coded data back for the next
    /// `read_next_marker` call.
    pub fn set_unread_marker(&mut self, code: u8) {
        self.unread_marker = Some(code);
    }

    #[cfg(test)]
    pub fn unread_marker(&self) -> Option<u8> {
        self.unread_marker
    }
}
