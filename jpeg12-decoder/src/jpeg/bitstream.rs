use super::{
    error::{ErrorManager, Result, Warning},
    jpeg_reader::JPEGParser,
    source::Source,
};

/// Bitstream reader over entropy-coded data. Undoes byte stuffing and stops at
/// the first marker, which is handed back to the parser.
#[derive(Debug, Default)]
pub struct Bitstream {
    buffer: u64,
    bits: u32,
    hit_marker: bool,
}

impl Bitstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards buffered bits, as done at a restart marker.
    pub fn reset(&mut self) {
        self.buffer = 0;
        self.bits = 0;
        self.hit_marker = false;
    }

    fn fill<'data, S: Source<'data>>(
        &mut self,
        reader: &mut JPEGParser<'data, S>,
        err: &mut ErrorManager,
        need: u32,
    ) -> Result<()> {
        while self.bits < need {
            let byte = if self.hit_marker {
                0
            } else {
                match reader.read_next_byte()? {
                    0xFF => {
                        let mut code = reader.read_next_byte()?;
                        while code == 0xFF {
                            code = reader.read_next_byte()?;
                        }
                        if code == 0 {
                            0xFF
                        } else {
                            reader.set_unread_marker(code);
                            self.hit_marker = true;
                            err.warn(Warning::HitMarker);
                            0
                        }
                    }
                    byte => byte,
                }
            };
            self.buffer = (self.buffer << 8) | byte as u64;
            self.bits += 8;
        }
        Ok(())
    }

    /// Reads up to 16 bits, most significant first.
    pub fn read_bits<'data, S: Source<'data>>(
        &mut self,
        reader: &mut JPEGParser<'data, S>,
        err: &mut ErrorManager,
        bits: u32,
    ) -> Result<u32> {
        if bits == 0 {
            return Ok(0);
        }
        self.fill(reader, err, bits)?;
        self.bits -= bits;
        Ok(((self.buffer >> self.bits) & ((1u64 << bits) - 1)) as u32)
    }
}
