//! Builds small JPEG streams whose decoded samples are known.
//!
//! Every block's DC coefficient is `8 * (level - center)`, which comes back as
//! `level` after the IDCT as long as the first quantization entry is 1. Blocks
//! may also carry AC coefficients; `expected()` then runs a reference IDCT.
#![allow(dead_code)]

use std::f64::consts::{FRAC_1_SQRT_2, PI};

pub const ZEN_APP: u8 = 0xE3;

/// Largest AC magnitude category in the AC table.
const AC_MAX_SIZE: u8 = 10;

/// Natural order index of each zigzag position.
#[rustfmt::skip]
const NATURAL_ORDER: [usize; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10, 17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34, 27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// What every block carries after its DC difference.
#[derive(Debug, Clone)]
pub enum Ac {
    /// Quantized coefficients as (zigzag index, value), ascending by index.
    /// Runs of sixteen zeros or more are written with ZRL codes.
    Coefficients(Vec<(usize, i32)>),
    /// Bits written as is, as (value, length) pairs. No end of block follows.
    Raw(Vec<(u32, u32)>),
}

/// Flat level of a block, by component and block column and row in that
/// component's own sampling grid.
pub type Levels = fn(usize, usize, usize) -> u16;

pub struct TestImage {
    pub width: u16,
    pub height: u16,
    pub precision: u8,
    /// Horizontal and vertical sampling factor of every frame component.
    pub sampling: Vec<(u8, u8)>,
    /// Components listed in the first scan, counted from the first.
    pub scan_components: usize,
    pub restart_interval: u16,
    pub sof: u8,
    pub app_segments: Vec<(u8, Vec<u8>)>,
    pub levels: Levels,
    /// Quantization table in zigzag order, shared by every component.
    pub quant: [u8; 64],
    pub ac: Ac,
}

impl TestImage {
    pub fn grey(width: u16, height: u16, levels: Levels) -> Self {
        Self {
            width,
            height,
            precision: 12,
            sampling: vec![(1, 1)],
            scan_components: 1,
            restart_interval: 0,
            sof: 0xC1,
            app_segments: Vec::new(),
            levels,
            quant: [1; 64],
            ac: Ac::Coefficients(Vec::new()),
        }
    }

    pub fn color(width: u16, height: u16, sampling: Vec<(u8, u8)>, levels: Levels) -> Self {
        let scan_components = sampling.len();
        Self {
            sampling,
            scan_components,
            ..Self::grey(width, height, levels)
        }
    }

    pub fn zen(mut self, payload: &[u8]) -> Self {
        let mut segment = b"Zen".to_vec();
        segment.extend_from_slice(payload);
        self.app_segments.push((ZEN_APP, segment));
        self
    }

    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize * self.sampling.len()
    }

    fn max_sampling(&self) -> (usize, usize) {
        self.sampling.iter().fold((1, 1), |(h, v), &(ch, cv)| {
            (h.max(ch as usize), v.max(cv as usize))
        })
    }

    /// Samples a decoder should produce, row major with components interleaved.
    pub fn expected(&self) -> Vec<u16> {
        let (max_h, max_v) = self.max_sampling();
        let mut samples = Vec::with_capacity(self.sample_count());
        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                for (c, &(h, v)) in self.sampling.iter().enumerate() {
                    let cx = x * h as usize / max_h;
                    let cy = y * v as usize / max_v;
                    let block = self.block_samples(c, cx / 8, cy / 8);
                    samples.push(block[cy % 8][cx % 8]);
                }
            }
        }
        samples
    }

    /// Decoded samples of one block, through a straight float IDCT.
    fn block_samples(&self, component: usize, x: usize, y: usize) -> [[u16; 8]; 8] {
        let center = 1i32 << (self.precision - 1);
        let max_sample = (1i32 << self.precision) - 1;

        let mut coefficients = [[0f64; 8]; 8];
        let level = (self.levels)(component, x, y) as i32;
        coefficients[0][0] = (8 * (level - center)) as f64;
        if let Ac::Coefficients(ac) = &self.ac {
            for &(index, value) in ac {
                let natural = NATURAL_ORDER[index];
                coefficients[natural / 8][natural % 8] = (value * self.quant[index] as i32) as f64;
            }
        }

        let mut samples = [[0u16; 8]; 8];
        for (y, row) in samples.iter_mut().enumerate() {
            for (x, sample) in row.iter_mut().enumerate() {
                let mut sum = 0.0;
                for (v, line) in coefficients.iter().enumerate() {
                    for (u, &coefficient) in line.iter().enumerate() {
                        sum += basis(u, x) * basis(v, y) * coefficient;
                    }
                }
                *sample = (sum.round() as i32 + center).clamp(0, max_sample) as u16;
            }
        }
        samples
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];

        for (code, payload) in &self.app_segments {
            segment(&mut out, *code, payload);
        }

        let mut dqt = vec![0x00];
        dqt.extend(self.quant);
        segment(&mut out, 0xDB, &dqt);

        let mut sof = vec![self.precision];
        sof.extend(self.height.to_be_bytes());
        sof.extend(self.width.to_be_bytes());
        sof.push(self.sampling.len() as u8);
        for (i, &(h, v)) in self.sampling.iter().enumerate() {
            sof.extend([i as u8 + 1, h << 4 | v, 0]);
        }
        segment(&mut out, self.sof, &sof);

        // DC: sixteen 5-bit codes, code n is category n
        let mut dht = vec![0x00, 0, 0, 0, 0, 16];
        dht.extend([0u8; 11]);
        dht.extend(0u8..16);
        segment(&mut out, 0xC4, &dht);

        // AC: 1-bit end of block, then 9-bit codes for everything else
        let symbols = ac_symbols();
        let mut dht = vec![0x10, 1, 0, 0, 0, 0, 0, 0, 0, symbols.len() as u8];
        dht.extend([0u8; 7]);
        dht.push(0x00);
        dht.extend(symbols);
        segment(&mut out, 0xC4, &dht);

        if self.restart_interval > 0 {
            segment(&mut out, 0xDD, &self.restart_interval.to_be_bytes());
        }

        let mut sos = vec![self.scan_components as u8];
        for i in 0..self.scan_components {
            sos.extend([i as u8 + 1, 0x00]);
        }
        sos.extend([0, 63, 0]);
        segment(&mut out, 0xDA, &sos);

        self.encode_scan(&mut out);

        out.extend([0xFF, 0xD9]);
        out
    }

    fn encode_scan(&self, out: &mut Vec<u8>) {
        let (max_h, max_v) = self.max_sampling();
        let mcus_x = (self.width as usize).div_ceil(8 * max_h);
        let mcus_y = (self.height as usize).div_ceil(8 * max_v);
        let center = 1i32 << (self.precision - 1);

        let mut bits = BitWriter::default();
        let mut predictions = vec![0i32; self.scan_components];
        let mut restart_num = 0u8;

        for mcu in 0..mcus_x * mcus_y {
            let interval = self.restart_interval as usize;
            if interval > 0 && mcu > 0 && mcu % interval == 0 {
                bits.flush(out);
                out.extend([0xFF, 0xD0 + restart_num]);
                restart_num = (restart_num + 1) & 7;
                predictions.iter_mut().for_each(|p| *p = 0);
            }

            let (mcu_x, mcu_y) = (mcu % mcus_x, mcu / mcus_x);
            for c in 0..self.scan_components {
                let (h, v) = self.block_sampling(c);
                for block_y in 0..v {
                    for block_x in 0..h {
                        let level =
                            (self.levels)(c, mcu_x * h + block_x, mcu_y * v + block_y) as i32;
                        let dc = 8 * (level - center);
                        bits.write_dc(out, dc - predictions[c]);
                        predictions[c] = dc;
                        self.encode_ac(&mut bits, out);
                    }
                }
            }
        }
        bits.flush(out);
    }

    fn encode_ac(&self, bits: &mut BitWriter, out: &mut Vec<u8>) {
        match &self.ac {
            Ac::Coefficients(coefficients) => {
                let mut k = 0;
                for &(index, value) in coefficients {
                    let mut run = index - k - 1;
                    while run >= 16 {
                        bits.write_symbol(out, 0xF0);
                        run -= 16;
                    }
                    let (size, extra) = magnitude(value);
                    bits.write_symbol(out, (run as u8) << 4 | size as u8);
                    bits.write(out, extra, size);
                    k = index;
                }
                if k < 63 {
                    bits.write_symbol(out, 0x00);
                }
            }
            Ac::Raw(raw) => {
                for &(value, length) in raw {
                    bits.write(out, value, length);
                }
            }
        }
    }

    /// A lone component is one block per MCU, whatever it declares.
    fn block_sampling(&self, component: usize) -> (usize, usize) {
        if self.sampling.len() == 1 {
            return (1, 1);
        }
        let (h, v) = self.sampling[component];
        (h as usize, v as usize)
    }
}

fn basis(frequency: usize, position: usize) -> f64 {
    let scale = if frequency == 0 { FRAC_1_SQRT_2 } else { 1.0 };
    scale * ((2 * position + 1) as f64 * frequency as f64 * PI / 16.0).cos() / 2.0
}

/// AC symbols with a 9-bit code, in code order: ZRL then every run and size.
fn ac_symbols() -> Vec<u8> {
    let mut symbols = vec![0xF0];
    for run in 0..16u8 {
        for size in 1..=AC_MAX_SIZE {
            symbols.push(run << 4 | size);
        }
    }
    symbols
}

/// Huffman code of an AC symbol as (value, length).
pub fn ac_code(symbol: u8) -> (u32, u32) {
    if symbol == 0x00 {
        return (0, 1);
    }
    let index = ac_symbols()
        .iter()
        .position(|&s| s == symbol)
        .expect("symbol outside the AC table");
    (0x100 + index as u32, 9)
}

/// Magnitude category of a coefficient and the bits that follow it.
fn magnitude(value: i32) -> (u32, u32) {
    let category = 32 - value.unsigned_abs().leading_zeros();
    let extra = if value < 0 {
        value + (1 << category) - 1
    } else {
        value
    };
    (category, extra as u32)
}

fn segment(out: &mut Vec<u8>, code: u8, payload: &[u8]) {
    out.extend([0xFF, code]);
    out.extend((payload.len() as u16 + 2).to_be_bytes());
    out.extend_from_slice(payload);
}

#[derive(Default)]
struct BitWriter {
    byte: u8,
    count: u32,
}

impl BitWriter {
    fn write(&mut self, out: &mut Vec<u8>, value: u32, bits: u32) {
        for shift in (0..bits).rev() {
            self.byte = self.byte << 1 | ((value >> shift) & 1) as u8;
            self.count += 1;
            if self.count == 8 {
                out.push(self.byte);
                if self.byte == 0xFF {
                    out.push(0x00);
                }
                self.byte = 0;
                self.count = 0;
            }
        }
    }

    fn write_dc(&mut self, out: &mut Vec<u8>, diff: i32) {
        let (category, extra) = magnitude(diff);
        self.write(out, category, 5);
        self.write(out, extra, category);
    }

    fn write_symbol(&mut self, out: &mut Vec<u8>, symbol: u8) {
        let (code, length) = ac_code(symbol);
        self.write(out, code, length);
    }

    /// Pads the last byte with ones.
    fn flush(&mut self, out: &mut Vec<u8>) {
        while self.count != 0 {
            self.write(out, 1, 1);
        }
    }
}

/// Offset of the first byte after the SOS segment.
pub fn scan_data_offset(data: &[u8]) -> usize {
    let sos = data
        .windows(2)
        .position(|w| w == [0xFF, 0xDA])
        .expect("no SOS marker");
    sos + 2 + u16::from_be_bytes([data[sos + 2], data[sos + 3]]) as usize
}
