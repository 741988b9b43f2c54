//! Byte oriented run-length codec.
//!
//! Runs are introduced by the `0xC3` code byte:
//! - `C3 00` is a literal `C3`
//! - `C3 n v` with `4 <= n <= 255` is `n` copies of `v`
//! - `C3 h l v` with `1 <= h <= 3` is `h << 8 | l` copies of `v`
//!
//! Every other byte stands for itself.

use crate::error::{Error, Result};

const CODE: u8 = 0xC3;
const MIN_RUN: usize = 4;
const MAX_SHORT_RUN: usize = 0xFF;
const MAX_RUN: usize = 0x3FF;

/// Packs `input`, turning runs of four or more equal bytes into run codes.
pub fn pack(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() / 4 + 16);

    let mut i = 0;
    while i < input.len() {
        let value = input[i];
        let mut run = 1;
        while i + run < input.len() && input[i + run] == value && run < MAX_RUN {
            run += 1;
        }

        if run >= MIN_RUN {
            if run <= MAX_SHORT_RUN {
                output.extend_from_slice(&[CODE, run as u8, value]);
            } else {
                output.extend_from_slice(&[CODE, (run >> 8) as u8, run as u8, value]);
            }
        } else {
            for _ in 0..run {
                if value == CODE {
                    output.extend_from_slice(&[CODE, 0]);
                } else {
                    output.push(value);
                }
            }
        }
        i += run;
    }

    output
}

/// Expands `input`. Fails on a code cut off by the end of input, or once the
/// output would grow past `limit` bytes.
pub fn unpack(input: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(limit);
    let mut bytes = input.iter().copied();

    while let Some(byte) = bytes.next() {
        if byte != CODE {
            push_run(&mut output, byte, 1, limit)?;
            continue;
        }

        let count = match bytes.next().ok_or(Error::MaskCorrupt("truncated run code"))? {
            0 => {
                push_run(&mut output, CODE, 1, limit)?;
                continue;
            }
            high @ 1..=3 => {
                let low = bytes.next().ok_or(Error::MaskCorrupt("truncated run code"))?;
                (high as usize) << 8 | low as usize
            }
            count => count as usize,
        };
        let value = bytes.next().ok_or(Error::MaskCorrupt("truncated run code"))?;
        push_run(&mut output, value, count, limit)?;
    }

    Ok(output)
}

fn push_run(output: &mut Vec<u8>, value: u8, count: usize, limit: usize) -> Result<()> {
    if output.len() + count > limit {
        return Err(Error::MaskCorrupt("mask data larger than the image"));
    }
    output.resize(output.len() + count, value);
    Ok(())
}
