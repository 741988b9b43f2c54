use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::{Error, Result};

use super::rle;

/// Side of the square tile packed into one `u64`.
const TILE: usize = 8;

/// A bit per pixel, stored as 8x8 tiles.
///
/// Tiles are kept in row-major order and each holds pixel `(x, y)` of its
/// area at bit `(y % 8) * 8 + x % 8`. The serialized form is the tiles as
/// little-endian words, run-length packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMask2D {
    width: usize,
    height: usize,
    tiles_x: usize,
    tiles: Vec<u64>,
}

impl BitMask2D {
    /// An all clear mask covering `width` by `height` pixels.
    pub fn new(width: usize, height: usize) -> Self {
        let tiles_x = width.div_ceil(TILE);
        let tiles_y = height.div_ceil(TILE);
        Self {
            width,
            height,
            tiles_x,
            tiles: vec![0; tiles_x * tiles_y],
        }
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Replaces the content with a packed mask of the same size.
    pub fn load(&mut self, packed: &[u8]) -> Result<()> {
        let expected = self.tiles.len() * 8;
        let bytes = rle::unpack(packed, expected)?;
        if bytes.len() != expected {
            return Err(Error::MaskCorrupt("mask data smaller than the image"));
        }

        for (tile, word) in self.tiles.iter_mut().zip(bytes.chunks_exact(8)) {
            *tile = LittleEndian::read_u64(word);
        }
        Ok(())
    }

    /// Packs the mask in the form `load` reads.
    pub fn store(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.tiles.len() * 8);
        for &tile in &self.tiles {
            // Writing to a Vec cannot fail
            let _ = bytes.write_u64::<LittleEndian>(tile);
        }
        rle::pack(&bytes)
    }

    /// Whether pixel `(x, y)` is set. Pixels outside the mask are clear.
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        match self.locate(x, y) {
            Some((tile, bit)) => self.tiles[tile] & bit != 0,
            None => false,
        }
    }

    /// Sets pixel `(x, y)`, ignoring pixels outside the mask.
    pub fn set(&mut self, x: usize, y: usize) {
        if let Some((tile, bit)) = self.locate(x, y) {
            self.tiles[tile] |= bit;
        }
    }

    /// Clears pixel `(x, y)`, ignoring pixels outside the mask.
    pub fn unset(&mut self, x: usize, y: usize) {
        if let Some((tile, bit)) = self.locate(x, y) {
            self.tiles[tile] &= !bit;
        }
    }

    fn locate(&self, x: usize, y: usize) -> Option<(usize, u64)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let tile = (y / TILE) * self.tiles_x + x / TILE;
        let bit = 1u64 << ((y % TILE) * TILE + x % TILE);
        Some((tile, bit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_query() {
        let mut mask = BitMask2D::new(10, 3);
        assert_eq!((mask.width(), mask.height()), (10, 3));
        mask.set(0, 0);
        mask.set(9, 2);
        assert!(mask.is_set(0, 0));
        assert!(mask.is_set(9, 2));
        assert!(!mask.is_set(8, 2));
        assert!(!mask.is_set(10, 0));

        mask.unset(0, 0);
        assert!(!mask.is_set(0, 0));
    }

    #[test]
    fn bit_layout() {
        let mut mask = BitMask2D::new(16, 8);
        mask.set(1, 0);
        mask.set(8, 1);
        assert_eq!(mask.tiles, [0b10, 1 << 8]);
    }

    #[test]
    fn store_then_load() {
        let mut mask = BitMask2D::new(37, 21);
        for y in 0..21 {
            for x in (y % 3..37).step_by(3) {
                mask.set(x, y);
            }
        }
        let packed = mask.store();

        let mut loaded = BitMask2D::new(37, 21);
        loaded.load(&packed).unwrap();
        assert_eq!(loaded, mask);
    }

    #[test]
    fn empty_mask_packs_small() {
        let mask = BitMask2D::new(256, 256);
        assert!(mask.store().len() < 64);
    }

    #[test]
    fn load_rejects_wrong_size() {
        let packed = BitMask2D::new(16, 16).store();
        assert!(BitMask2D::new(8, 8).load(&packed).is_err());
        assert!(BitMask2D::new(24, 16).load(&packed).is_err());
        assert!(BitMask2D::new(16, 16).load(&packed).is_ok());
    }
}
