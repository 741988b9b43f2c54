use super::error::{Error, Result};

/// Supplies compressed bytes to the decompressor.
///
/// Bytes handed out by `bytes` borrow from the underlying data for `'data`,
/// so marker handlers can keep references to segment payloads.
pub trait Source<'data> {
    /// Called once before the first byte is read.
    fn init(&mut self) {}

    /// Bytes available right now, starting at the read position.
    fn bytes(&self) -> &'data [u8];

    /// Consumes `count` bytes. `count` never exceeds `bytes().len()`.
    fn consume(&mut self, count: usize);

    /// Makes more bytes available, or fails if there are none to come.
    fn fill(&mut self) -> Result<()>;

    /// Skips `count` bytes of data the decompressor has no use for.
    fn skip(&mut self, count: usize) -> Result<()>;

    /// Called once after the last byte was read.
    fn term(&mut self) {}
}

/// A source over a complete, in-memory image. Everything is available from
/// the start, so asking for more is always fatal.
#[derive(Debug)]
pub struct MemorySource<'data> {
    remaining: &'data [u8],
}

impl<'data> MemorySource<'data> {
    pub fn new(data: &'data [u8]) -> Self {
        Self { remaining: data }
    }
}

impl<'data> Source<'data> for MemorySource<'data> {
    fn bytes(&self) -> &'data [u8] {
        self.remaining
    }

    fn consume(&mut self, count: usize) {
        self.remaining = &self.remaining[count.min(self.remaining.len())..];
    }

    fn fill(&mut self) -> Result<()> {
        Err(Error::CantSuspend)
    }

    fn skip(&mut self, count: usize) -> Result<()> {
        if count > self.remaining.len() {
            self.remaining = &[];
            return self.fill();
        }
        self.consume(count);
        Ok(())
    }
}
