use std::f64::consts::PI;

use super::{
    bitstream::Bitstream,
    error::{Error, ErrorManager, Result, Warning},
    header::{HeaderInfo, HuffmanTable},
    jpeg_reader::JPEGParser,
    source::Source,
};
use crate::marker::JPEGMarker;

#[rustfmt::skip]
pub const ZIGZAG_MAP: &[(u8, u8)] =
    &[(0, 0), (0, 1), (1, 0), (2, 0), (1, 1), (0, 2), (0, 3), (1, 2),
          (2, 1), (3, 0), (4, 0), (3, 1), (2, 2), (1, 3), (0, 4), (0, 5),
          (1, 4), (2, 3), (3, 2), (4, 1), (5, 0), (6, 0), (5, 1), (4, 2),
          (3, 3), (2, 4), (1, 5), (0, 6), (0, 7), (1, 6), (2, 5), (3, 4),
          (4, 3), (5, 2), (6, 1), (7, 0), (7, 1), (6, 2), (5, 3), (4, 4),
          (3, 5), (2, 6), (1, 7), (2, 7), (3, 6), (4, 5), (5, 4), (6, 3),
          (7, 2), (7, 3), (6, 4), (5, 5), (4, 6), (3, 7), (4, 7), (5, 6),
          (6, 5), (7, 4), (7, 5), (6, 6), (5, 7), (6, 7), (7, 6), (7, 7)];

/// Per component decoding state for one scan.
struct ComponentDecoder {
    frame_index: usize,
    sampling: (usize, usize),
    dc_table: HuffmanTable,
    ac_table: HuffmanTable,
    qtable: [[u16; 8]; 8],
    dc_prediction: i32,
    /// Samples of the current MCU row, `plane_width` wide and `8 * sampling.1` high.
    plane: Vec<u16>,
    plane_width: usize,
}

/// Decodes a sequential Huffman scan one output row at a time.
pub struct EntropyDecoder {
    components: Vec<ComponentDecoder>,
    bits: Bitstream,
    max_sampling: (usize, usize),
    mcu_height: usize,
    mcus_per_row: usize,
    width: usize,
    num_components: usize,
    center: i32,
    max_sample: i32,
    /// Row within the current MCU row that the next scanline comes from.
    row_in_mcu: usize,
    restart_interval: u16,
    restarts_to_go: u16,
    next_restart_num: u8,
    idct_table: [[f32; 8]; 8],
}

impl EntropyDecoder {
    /// Resolves every table the scan refers to. Fails when one is missing.
    pub fn new(header: &HeaderInfo) -> Result<Self> {
        let mcus_per_row = header.mcu_info.mcu_padded_dimensions.0 as usize;
        let max_sampling = (
            header.mcu_info.max_xy_sampling_factor.0 as usize,
            header.mcu_info.max_xy_sampling_factor.1 as usize,
        );

        let mut components = Vec::with_capacity(header.components.len());
        for component in &header.components {
            let dc_table = header
                .dc_huff_tables
                .get(&component.scan.dc_table)
                .ok_or(Error::NoHuffTable(component.scan.dc_table))?
                .clone();
            let ac_table = header
                .ac_huff_tables
                .get(&component.scan.ac_table)
                .ok_or(Error::NoHuffTable(0x10 | component.scan.ac_table))?
                .clone();
            let qtable = header
                .quant_tables
                .get(&component.frame.qtable_id)
                .ok_or(Error::NoQuantTable(component.frame.qtable_id))?
                .table;

            let sampling = (
                component.frame.xy_sampling_factor.0 as usize,
                component.frame.xy_sampling_factor.1 as usize,
            );
            let plane_width = mcus_per_row * sampling.0 * 8;
            components.push(ComponentDecoder {
                frame_index: component.frame_index,
                sampling,
                dc_table,
                ac_table,
                qtable,
                dc_prediction: 0,
                plane: vec![0; plane_width * sampling.1 * 8],
                plane_width,
            });
        }

        let precision = header.frame_info.precision as u32;
        let mut idct_table = [[0f32; 8]; 8];
        for (x, row) in idct_table.iter_mut().enumerate() {
            for (u, value) in row.iter_mut().enumerate() {
                let scale = if u == 0 { 1.0 / 2f64.sqrt() } else { 1.0 };
                *value = (scale * ((2 * x + 1) as f64 * u as f64 * PI / 16.0).cos() / 2.0) as f32;
            }
        }

        Ok(Self {
            components,
            bits: Bitstream::new(),
            max_sampling,
            mcu_height: header.mcu_info.mcu_size.1 as usize,
            mcus_per_row,
            width: header.frame_info.image_size.0 as usize,
            num_components: header.frame_info.components.len(),
            center: 1 << (precision - 1),
            max_sample: (1 << precision) - 1,
            row_in_mcu: 0,
            restart_interval: header.restart_interval,
            restarts_to_go: header.restart_interval,
            next_restart_num: 0,
            idct_table,
        })
    }

    /// Fills `row` with the next scanline, components interleaved in frame order.
    pub fn read_scanline<'data, S: Source<'data>>(
        &mut self,
        reader: &mut JPEGParser<'data, S>,
        err: &mut ErrorManager,
        row: &mut [u16],
    ) -> Result<()> {
        if self.row_in_mcu == 0 {
            self.decode_mcu_row(reader, err)?;
        }

        let (max_h, max_v) = self.max_sampling;
        for component in &self.components {
            let (h, v) = component.sampling;
            let line = (self.row_in_mcu * v / max_v) * component.plane_width;
            for x in 0..self.width {
                row[x * self.num_components + component.frame_index] =
                    component.plane[line + x * h / max_h];
            }
        }

        self.row_in_mcu = (self.row_in_mcu + 1) % self.mcu_height;
        Ok(())
    }

    fn decode_mcu_row<'data, S: Source<'data>>(
        &mut self,
        reader: &mut JPEGParser<'data, S>,
        err: &mut ErrorManager,
    ) -> Result<()> {
        let mut coefficients = [[0f32; 8]; 8];
        for mcu_x in 0..self.mcus_per_row {
            if self.restart_interval > 0 {
                if self.restarts_to_go == 0 {
                    self.process_restart(reader, err)?;
                }
                self.restarts_to_go -= 1;
            }

            for index in 0..self.components.len() {
                let (h, v) = self.components[index].sampling;
                for block_y in 0..v {
                    for block_x in 0..h {
                        self.decode_block(reader, err, index, &mut coefficients)?;
                        let origin = (mcu_x * h + block_x) * 8;
                        self.idct_block(index, &coefficients, origin, block_y * 8);
                    }
                }
            }
        }
        Ok(())
    }

    fn process_restart<'data, S: Source<'data>>(
        &mut self,
        reader: &mut JPEGParser<'data, S>,
        err: &mut ErrorManager,
    ) -> Result<()> {
        self.bits.reset();

        let expected = JPEGMarker::RST0.code() + self.next_restart_num;
        let code = reader.read_next_marker(err)?;
        if code != expected {
            err.warn(Warning::MustResync {
                found: code,
                expected: self.next_restart_num,
            });
            if !JPEGMarker::from_code(code).is_some_and(|m| m.is_restart()) {
                reader.set_unread_marker(code);
            }
        }

        for component in &mut self.components {
            component.dc_prediction = 0;
        }
        self.restarts_to_go = self.restart_interval;
        self.next_restart_num = (self.next_restart_num + 1) & 7;
        Ok(())
    }

    /// Decodes one block into dequantized coefficients in natural order.
    // https://www.w3.org/Graphics/JPEG/itu-t81.pdf
    // F.2.2 Page 104
    fn decode_block<'data, S: Source<'data>>(
        &mut self,
        reader: &mut JPEGParser<'data, S>,
        err: &mut ErrorManager,
        index: usize,
        coefficients: &mut [[f32; 8]; 8],
    ) -> Result<()> {
        *coefficients = [[0f32; 8]; 8];
        let component = &mut self.components[index];

        let dc_code = Self::decode_next_value(&mut self.bits, reader, err, &component.dc_table)?;
        let diff = if dc_code > 16 {
            err.warn(Warning::HuffBadCode);
            0
        } else {
            let value = self.bits.read_bits(reader, err, dc_code as u32)?;
            extend(value, dc_code)
        };
        component.dc_prediction = component.dc_prediction.wrapping_add(diff);
        coefficients[0][0] = component.dc_prediction as f32 * component.qtable[0][0] as f32;

        let mut k = 1;
        while k < 64 {
            let symbol = Self::decode_next_value(&mut self.bits, reader, err, &component.ac_table)?;
            let run_length = (symbol >> 4) as usize;
            let code_length = symbol & 0x0F;

            if code_length != 0 {
                k += run_length;
                if k > 63 {
                    return Err(Error::AcRunOverflow);
                }
                let value = self.bits.read_bits(reader, err, code_length as u32)?;
                let (row, col) = ZIGZAG_MAP[k];
                let (row, col) = (row as usize, col as usize);
                coefficients[row][col] =
                    extend(value, code_length) as f32 * component.qtable[row][col] as f32;
            } else if run_length == 15 {
                k += 15;
            } else {
                break;
            }
            k += 1;
        }
        Ok(())
    }

    fn decode_next_value<'data, S: Source<'data>>(
        bits: &mut Bitstream,
        reader: &mut JPEGParser<'data, S>,
        err: &mut ErrorManager,
        table: &HuffmanTable,
    ) -> Result<u8> {
        let mut code: i32 = 0;
        for length in 1..=16 {
            code = (code << 1) | bits.read_bits(reader, err, 1)? as i32;
            if let Some(symbol) = table.lookup(code, length) {
                return Ok(symbol);
            }
        }

        err.warn(Warning::HuffBadCode);
        Ok(0)
    }

    // https://www.w3.org/Graphics/JPEG/itu-t81.pdf
    // A.3.3 Page 27
    fn idct_block(
        &mut self,
        index: usize,
        coefficients: &[[f32; 8]; 8],
        origin_x: usize,
        origin_y: usize,
    ) {
        let table = &self.idct_table;

        let mut rows = [[0f32; 8]; 8];
        for v in 0..8 {
            for x in 0..8 {
                rows[v][x] = (0..8).map(|u| table[x][u] * coefficients[v][u]).sum();
            }
        }

        let component = &mut self.components[index];
        for y in 0..8 {
            let line = (origin_y + y) * component.plane_width + origin_x;
            for x in 0..8 {
                let value: f32 = (0..8).map(|v| table[y][v] * rows[v][x]).sum();
                let sample = (value.round() as i32)
                    .saturating_add(self.center)
                    .clamp(0, self.max_sample);
                component.plane[line + x] = sample as u16;
            }
        }
    }
}

/// Turns `bits` of magnitude into a signed coefficient.
fn extend(value: u32, bits: u8) -> i32 {
    if bits == 0 {
        return 0;
    }
    let value = value as i32;
    if value < 1 << (bits - 1) {
        value - (1 << bits) + 1
    } else {
        value
    }
}
