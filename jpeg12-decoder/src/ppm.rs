use std::{
    fs::File,
    io::{self, BufWriter, Write},
};

use byteorder::{BigEndian, WriteBytesExt};

use crate::image::{Bitmap, ImageEncoder};

/// Binary PGM/PPM encoder with 16-bit samples
pub struct PNMEncoder<'bitmap> {
    bitmap: &'bitmap Bitmap,
}

impl<'bitmap> PNMEncoder<'bitmap> {
    /// Writes the bitmap as P5 (one channel) or P6 (three channels).
    pub fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let magic = match self.bitmap.channels {
            1 => "P5",
            3 => "P6",
            channels => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("PNM cannot hold {channels} channels"),
                ))
            }
        };
        let max_value = (1u32 << self.bitmap.precision.min(16)) - 1;

        writeln!(writer, "{magic}")?;
        writeln!(writer, "{} {}", self.bitmap.size.0, self.bitmap.size.1)?;
        writeln!(writer, "{max_value}")?;

        for &sample in &self.bitmap.data {
            writer.write_u16::<BigEndian>(sample)?;
        }
        writer.flush()
    }
}

impl<'bitmap> ImageEncoder<'bitmap> for PNMEncoder<'bitmap> {
    fn new(bitmap: &'bitmap Bitmap) -> Self {
        Self { bitmap }
    }

    fn encode_to_file(&self, path: &str) -> io::Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        self.encode(&mut file)
    }
}
