use std::{cmp::max, collections::HashMap};

use crate::marker::JPEGMarker;

use super::{
    error::{Error, ErrorManager, Result, Warning},
    jpeg_core::ZIGZAG_MAP,
    jpeg_reader::JPEGParser,
    source::Source,
    MarkerHandler,
};

/// Largest width or height the decoder accepts.
pub const MAX_DIMENSION: u16 = 65500;
/// Most components a frame may declare.
pub const MAX_COMPONENTS: u8 = 10;
/// Most blocks one interleaved MCU may hold.
pub const MAX_BLOCKS_IN_MCU: usize = 10;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanTableType {
    #[default]
    Ac,
    Dc,
}

/// Defines a JPEG huffman table
#[derive(Debug, Default, Clone)]
pub struct HuffmanTable {
    pub table_type: HuffmanTableType,
    pub destination_id: u8,
    pub bitcode_counts: [u8; 16],
    pub symbols: Vec<u8>,
    pub codes: Vec<u16>,
    /// Largest code of each length, -1 where there are none. Index is the length.
    pub max_code: [i32; 17],
    /// Added to a code of each length to find its symbol index.
    pub value_offset: [i32; 17],
}

impl HuffmanTable {
    fn generate_codes(&mut self) -> Result<()> {
        let mut code: u32 = 0;
        for (index, &code_count) in self.bitcode_counts.iter().enumerate() {
            for _ in 0..code_count {
                self.codes.push(code as u16);
                code += 1;
            }
            // Codes of all ones are reserved
            if code >= 1 << (index + 1) {
                return Err(Error::BadHuffTable);
            }
            code <<= 1;
        }

        let mut symbol_index = 0i32;
        for length in 1..=16 {
            let count = self.bitcode_counts[length - 1] as i32;
            if count == 0 {
                self.max_code[length] = -1;
                continue;
            }
            let first_code = self.codes[symbol_index as usize] as i32;
            self.value_offset[length] = symbol_index - first_code;
            symbol_index += count;
            self.max_code[length] = first_code + count - 1;
        }
        Ok(())
    }

    /// Symbol for `code` of `length` bits, if the table has one.
    pub fn lookup(&self, code: i32, length: usize) -> Option<u8> {
        if code > self.max_code[length] {
            return None;
        }
        let index = self.value_offset[length] + code;
        self.symbols.get(usize::try_from(index).ok()?).copied()
    }
}

/// A dequantization table in natural order.
#[derive(Debug, Clone)]
pub struct QuantizationTable {
    pub precision: u8,
    pub destination_id: u8,
    pub table: [[u16; 8]; 8],
}

#[derive(Debug, Default, Clone)]
pub struct FrameComponent {
    pub identifier: u8,
    pub xy_sampling_factor: (u8, u8),
    pub qtable_id: u8,
}

#[derive(Debug, Default, Clone)]
pub struct ScanComponent {
    pub selector: u8,
    pub dc_table: u8,
    pub ac_table: u8,
}

/// A frame component paired with its scan parameters, in scan order.
#[derive(Debug, Default, Clone)]
pub struct Component {
    pub frame: FrameComponent,
    pub scan: ScanComponent,
    /// Position of the component in the frame header, which is its position
    /// in an output pixel.
    pub frame_index: usize,
}

#[derive(Debug, Default)]
pub struct ScanInfo {
    pub components: Vec<ScanComponent>,
    pub spectral_selection: (u8, u8),
    pub successive_approximation: u8,
}

impl ScanInfo {
    fn is_sequential(&self) -> bool {
        self.spectral_selection == (0, 63) && self.successive_approximation == 0
    }
}

#[derive(Debug, Default)]
pub struct FrameInfo {
    pub precision: u8,
    pub image_size: (u16, u16),
    pub components: Vec<FrameComponent>,
    pub progressive: bool,
    pub arith_code: bool,
}

#[derive(Debug, Default)]
pub struct MCUInfo {
    pub max_xy_sampling_factor: (u8, u8),
    pub mcu_size: (u16, u16),
    pub mcu_padded_dimensions: (u16, u16),
}

#[derive(Debug, Default)]
pub struct HeaderInfo {
    pub frame_info: FrameInfo,
    pub scan_info: ScanInfo,
    pub components: Vec<Component>,
    pub ac_huff_tables: HashMap<u8, HuffmanTable>,
    pub dc_huff_tables: HashMap<u8, HuffmanTable>,
    pub quant_tables: HashMap<u8, QuantizationTable>,
    pub restart_interval: u16,
    pub mcu_info: MCUInfo,
}

impl HeaderInfo {
    fn read_start_of_frame<'data, S: Source<'data>>(
        reader: &mut JPEGParser<'data, S>,
        progressive: bool,
        arith_code: bool,
    ) -> Result<FrameInfo> {
        let length = reader.read_segment_length()?;

        let precision = reader.read_next_byte()?;

        let height = reader.read_next_word()?;
        let width = reader.read_next_word()?;

        let component_count = reader.read_next_byte()?;

        if length != 6 + 3 * component_count as usize {
            return Err(Error::BadLength(length as u16 + 2));
        }
        if width == 0 || height == 0 || component_count == 0 {
            return Err(Error::EmptyImage);
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(Error::ImageTooBig(MAX_DIMENSION as u32));
        }
        if precision != 8 && precision != 12 {
            return Err(Error::BadPrecision(precision));
        }
        if component_count > MAX_COMPONENTS {
            return Err(Error::ComponentCount(component_count));
        }

        let mut components: Vec<FrameComponent> = Vec::with_capacity(component_count as usize);

        for _ in 0..component_count {
            let identifier = reader.read_next_byte()?;
            if components.iter().any(|c| c.identifier == identifier) {
                return Err(Error::DuplicateComponent(identifier));
            }

            let sample_factors = reader.read_next_byte()?;
            let xy_sampling_factor = (sample_factors >> 4, sample_factors & 0x0F);
            if !(1..=4).contains(&xy_sampling_factor.0) || !(1..=4).contains(&xy_sampling_factor.1)
            {
                return Err(Error::BadSampling);
            }

            let qtable_id = reader.read_next_byte()?;

            components.push(FrameComponent {
                identifier,
                xy_sampling_factor,
                qtable_id,
            })
        }

        Ok(FrameInfo {
            precision,
            image_size: (width, height),
            components,
            progressive,
            arith_code,
        })
    }

    fn read_quantization_tables<'data, S: Source<'data>>(
        reader: &mut JPEGParser<'data, S>,
    ) -> Result<HashMap<u8, QuantizationTable>> {
        let struct_size = reader.read_segment_length()?;

        let mut quant_tables: HashMap<u8, QuantizationTable> = HashMap::new();

        let end_of_table = reader.position() + struct_size as u64;
        while reader.position() < end_of_table {
            let table_info = reader.read_next_byte()?;
            let precision = table_info >> 4;
            let destination_id = table_info & 0x0F;
            if destination_id > 3 {
                return Err(Error::BadDqtIndex(destination_id));
            }

            let mut zagged_table = [0u16; 64];
            for value in zagged_table.iter_mut() {
                *value = match precision {
                    0 => reader.read_next_byte()? as u16,
                    1 => reader.read_next_word()?,
                    _ => return Err(Error::BadDqtPrecision(precision)),
                }
            }

            let mut unzagged_table = [[0u16; 8]; 8];
            for (i, &value) in zagged_table.iter().enumerate() {
                let (row, col) = ZIGZAG_MAP[i];
                unzagged_table[row as usize][col as usize] = value;
            }
            quant_tables.insert(
                destination_id,
                QuantizationTable {
                    precision,
                    destination_id,
                    table: unzagged_table,
                },
            );
        }
        if reader.position() != end_of_table {
            return Err(Error::BadLength(struct_size as u16 + 2));
        }

        Ok(quant_tables)
    }

    fn read_huffman_tables<'data, S: Source<'data>>(
        reader: &mut JPEGParser<'data, S>,
    ) -> Result<Vec<HuffmanTable>> {
        let struct_size = reader.read_segment_length()?;

        let mut tables = Vec::new();

        let end_of_table = reader.position() + struct_size as u64;
        while reader.position() < end_of_table {
            let table_info = reader.read_next_byte()?;
            let table_type = match table_info >> 4 {
                0 => HuffmanTableType::Dc,
                1 => HuffmanTableType::Ac,
                _ => return Err(Error::BadDhtIndex(table_info)),
            };

            let destination_id = table_info & 0x0F;
            if destination_id > 3 {
                return Err(Error::BadDhtIndex(table_info));
            }

            let mut bitcode_counts: [u8; 16] = [0; 16];
            for count in bitcode_counts.iter_mut() {
                *count = reader.read_next_byte()?;
            }

            let size: usize = bitcode_counts
                .iter()
                .fold(0, |total, elem| total + *elem as usize);
            let remaining = end_of_table.saturating_sub(reader.position());
            if size > 256 || size as u64 > remaining {
                return Err(Error::BadHuffTable);
            }

            let symbols = reader.read_bytes(size)?.to_vec();

            let mut table = HuffmanTable {
                table_type,
                destination_id,
                bitcode_counts,
                symbols,
                ..Default::default()
            };

            table.generate_codes()?;
            tables.push(table);
        }
        if reader.position() != end_of_table {
            return Err(Error::BadLength(struct_size as u16 + 2));
        }

        Ok(tables)
    }

    fn read_restart_interval<'data, S: Source<'data>>(
        reader: &mut JPEGParser<'data, S>,
    ) -> Result<u16> {
        let length = reader.read_segment_length()?;
        if length != 2 {
            return Err(Error::BadLength(length as u16 + 2));
        }
        reader.read_next_word()
    }

    /// Reads data from the scan header, leaving the cursor at the start of the scan stream.
    fn read_start_of_scan<'data, S: Source<'data>>(
        reader: &mut JPEGParser<'data, S>,
        frame: &FrameInfo,
    ) -> Result<ScanInfo> {
        let length = reader.read_segment_length()?;

        let component_count = reader.read_next_byte()?;
        if length != 4 + 2 * component_count as usize || !(1..=4).contains(&component_count) {
            return Err(Error::BadLength(length as u16 + 2));
        }

        let mut components: Vec<ScanComponent> = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            let selector = reader.read_next_byte()?;
            if !frame.components.iter().any(|c| c.identifier == selector)
                || components.iter().any(|c| c.selector == selector)
            {
                return Err(Error::BadComponentId(selector));
            }

            let tables = reader.read_next_byte()?;
            let dc_table = tables >> 4;
            let ac_table = tables & 0x0F;

            components.push(ScanComponent {
                selector,
                dc_table,
                ac_table,
            });
        }

        let spectral_selection_start = reader.read_next_byte()?;
        let spectral_selection_end = reader.read_next_byte()?;

        let successive_approximation = reader.read_next_byte()?;

        Ok(ScanInfo {
            components,
            spectral_selection: (spectral_selection_start, spectral_selection_end),
            successive_approximation,
        })
    }

    /// Reads header info from a given JPEGParser. The JPEGParser is expected to be at position 0
    /// in a JPEG data stream. It returns when it find the start of scan marker, reads its header,
    /// and leaves the cursor at the scan stream.
    pub fn read_header_info<'data, S, H>(
        reader: &mut JPEGParser<'data, S>,
        err: &mut ErrorManager,
        handler: &mut H,
        registered: &[JPEGMarker],
    ) -> Result<Self>
    where
        S: Source<'data>,
        H: MarkerHandler<'data>,
    {
        reader.read_first_marker()?;

        let mut frame_info: Option<FrameInfo> = None;
        let mut result: Self = Default::default();

        loop {
            let code = reader.read_next_marker(err)?;
            let marker = JPEGMarker::from_code(code).ok_or(Error::UnknownMarker(code))?;

            match marker {
                JPEGMarker::SOI => return Err(Error::DuplicateSoi),
                JPEGMarker::EOI => return Err(Error::NoImage),
                m if m.is_start_of_frame() => {
                    if frame_info.is_some() {
                        return Err(Error::DuplicateSof);
                    }
                    let (progressive, arith_code) = match m {
                        JPEGMarker::SOF0 | JPEGMarker::SOF1 => (false, false),
                        JPEGMarker::SOF2 => (true, false),
                        JPEGMarker::SOF9 => (false, true),
                        JPEGMarker::SOF10 => (true, true),
                        _ => return Err(Error::SofUnsupported(code)),
                    };
                    frame_info = Some(Self::read_start_of_frame(reader, progressive, arith_code)?);
                }
                JPEGMarker::DHT => {
                    for table in Self::read_huffman_tables(reader)? {
                        match table.table_type {
                            HuffmanTableType::Ac => {
                                result.ac_huff_tables.insert(table.destination_id, table)
                            }
                            HuffmanTableType::Dc => {
                                result.dc_huff_tables.insert(table.destination_id, table)
                            }
                        };
                    }
                }
                JPEGMarker::DQT => {
                    for table in Self::read_quantization_tables(reader)?.into_values() {
                        log::trace!(
                            "quantization table {}, {} bit",
                            table.destination_id,
                            8 << table.precision
                        );
                        result.quant_tables.insert(table.destination_id, table);
                    }
                }
                JPEGMarker::DRI => {
                    result.restart_interval = Self::read_restart_interval(reader)?;
                }
                JPEGMarker::SOS => {
                    result.frame_info = frame_info.ok_or(Error::SosBeforeSof)?;
                    result.scan_info = Self::read_start_of_scan(reader, &result.frame_info)?;

                    if !result.frame_info.progressive && !result.scan_info.is_sequential() {
                        err.warn(Warning::NotSequential);
                    }

                    result.setup_components();
                    result.setup_mcu_info()?;
                    return Ok(result);
                }
                _ => read_misc_marker(reader, marker, handler, registered)?,
            }
        }
    }

    fn setup_components(&mut self) {
        self.components = self
            .scan_info
            .components
            .iter()
            .filter_map(|scan| {
                let frame_index = self
                    .frame_info
                    .components
                    .iter()
                    .position(|c| c.identifier == scan.selector)?;
                Some(Component {
                    frame: self.frame_info.components[frame_index].clone(),
                    scan: scan.clone(),
                    frame_index,
                })
            })
            .collect();

        // A lone component is coded one block per MCU, whatever it declares
        if self.frame_info.components.len() == 1 {
            for component in &mut self.components {
                component.frame.xy_sampling_factor = (1, 1);
            }
        }
    }

    fn setup_mcu_info(&mut self) -> Result<()> {
        self.mcu_info.max_xy_sampling_factor = self.components.iter().fold(
            (1, 1),
            |(max_h_fac, max_v_fac), component| {
                (
                    max(component.frame.xy_sampling_factor.0, max_h_fac),
                    max(component.frame.xy_sampling_factor.1, max_v_fac),
                )
            },
        );

        let blocks_in_mcu: usize = self
            .components
            .iter()
            .map(|c| c.frame.xy_sampling_factor.0 as usize * c.frame.xy_sampling_factor.1 as usize)
            .sum();
        if blocks_in_mcu > MAX_BLOCKS_IN_MCU {
            return Err(Error::BadMcuSize);
        }

        self.mcu_info.mcu_size = (
            8 * self.mcu_info.max_xy_sampling_factor.0 as u16,
            8 * self.mcu_info.max_xy_sampling_factor.1 as u16,
        );

        let (width, height) = self.frame_info.image_size;
        self.mcu_info.mcu_padded_dimensions = (
            width.div_ceil(self.mcu_info.mcu_size.0),
            height.div_ceil(self.mcu_info.mcu_size.1),
        );
        Ok(())
    }

    /// Several scans are needed when the first scan leaves out components or
    /// the frame is progressive.
    pub fn has_multiple_scans(&self) -> bool {
        self.frame_info.progressive
            || self.scan_info.components.len() < self.frame_info.components.len()
    }
}

/// Handles the markers that carry no decoding state: application segments go
/// to the handler when registered, the rest are skipped.
pub fn read_misc_marker<'data, S, H>(
    reader: &mut JPEGParser<'data, S>,
    marker: JPEGMarker,
    handler: &mut H,
    registered: &[JPEGMarker],
) -> Result<()>
where
    S: Source<'data>,
    H: MarkerHandler<'data>,
{
    match marker {
        m if m.is_restart() || m == JPEGMarker::TEM => {
            log::trace!("ignoring stray marker {m:?}");
            Ok(())
        }
        m if m.is_application() && registered.contains(&m) => {
            let length = reader.read_segment_length()?;
            let payload = reader.read_bytes(length)?;
            handler.process(m, payload)
        }
        m if m.is_application()
            || matches!(m, JPEGMarker::COM | JPEGMarker::DAC | JPEGMarker::DNL) =>
        {
            reader.skip_marker_with_length()
        }
        m => Err(Error::UnknownMarker(m.code())),
    }
}
