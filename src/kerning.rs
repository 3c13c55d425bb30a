//! Kerning group lookup and RLE offset-table decode.
//!
//! Port of the kerning walk in `ssfn_render`/`ssfn_kern` in `ssfn.h`: scan a
//! character's fragment list for a kerning-group descriptor, find the range
//! covering the next codepoint, then decode a short run-length stream to get the
//! signed pixel delta.

use crate::error::{Error, Result};
use crate::font_format::{CharRecord, FontImage, FragmentEntry};
use crate::fragment::FragmentKind;

struct KernRange {
    lo: u32,
    hi: u32,
    table_offset: u32,
}

fn parse_group(data: &[u8]) -> Result<Vec<KernRange>> {
    let b0 = *data.first().ok_or(Error::BadFile)?;
    let b1 = *data.get(1).ok_or(Error::BadFile)?;
    let count = ((((b0 & 0x1F) as usize) << 8) | b1 as usize) + 1;
    let entries = data.get(2..2 + count * 8).ok_or(Error::BadFile)?;
    let mut out = Vec::with_capacity(count);
    for e in entries.chunks_exact(8) {
        let lo_word = u32::from_le_bytes([e[0], e[1], e[2], 0]);
        let hi_word = u32::from_le_bytes([e[3], e[4], e[5], 0]);
        let lo = lo_word & 0xF_FFFF;
        let hi_idx_nibble = (lo_word >> 20) & 0xF;
        let hi = hi_word & 0xF_FFFF;
        let lo_idx_nibble = (hi_word >> 20) & 0xF;
        let off16 = u16::from_le_bytes([e[6], e[7]]) as u32;
        let table_offset = (hi_idx_nibble << 24) | (lo_idx_nibble << 16) | off16;
        out.push(KernRange { lo, hi, table_offset });
    }
    Ok(out)
}

/// Decode the RLE offset stream at `data` for run-position `p`, per spec.md §4.7
/// step 3: each record's first byte packs a constant-run flag (bit 7) and run
/// length `k` (bits 0-6).
fn decode_rle_value(data: &[u8], mut p: u32) -> Result<i32> {
    let mut pos = 0usize;
    loop {
        let ctrl = *data.get(pos).ok_or(Error::BadFile)?;
        let constant = ctrl & 0x80 != 0;
        let k = (ctrl & 0x7F) as u32;
        if p > k {
            p -= k + 1;
            pos += if constant { 2 } else { 2 + k as usize };
        } else {
            let idx = 1 + if constant { 0 } else { p as usize };
            let raw = *data.get(pos + idx).ok_or(Error::BadFile)?;
            return Ok(raw as i8 as i32);
        }
    }
}

/// Raw (unscaled) kerning adjustment for the transition from `rec` to
/// `next_codepoint`. Returns `(value, horizontal)`, or `None` if no kerning group
/// covers `next_codepoint`.
pub fn lookup(font: &FontImage, rec: CharRecord, next_codepoint: u32) -> Option<(i32, bool)> {
    if !font.has_kerning() {
        return None;
    }
    for entry in rec.fragments() {
        let FragmentEntry::Layer { xoffs, fragment_offset, .. } = entry else {
            continue;
        };
        let data = font.at(fragment_offset)?;
        if data.is_empty() || FragmentKind::classify(data[0]) != Ok(FragmentKind::KerningGroup) {
            continue;
        }
        let ranges = parse_group(data).ok()?;
        for r in &ranges {
            if next_codepoint < r.lo || next_codepoint > r.hi {
                continue;
            }
            let p = next_codepoint - r.lo;
            let addr = font.kerning_offs() + r.table_offset;
            let stream = font.at(addr)?;
            let value = decode_rle_value(stream, p).ok()?;
            return Some((value, xoffs != 0));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rle_constant_run() {
        // constant run, k=5 (covers p=0..5), value -2
        let data = [0x85u8, (-2i8) as u8];
        assert_eq!(decode_rle_value(&data, 0).unwrap(), -2);
        assert_eq!(decode_rle_value(&data, 5).unwrap(), -2);
    }

    #[test]
    fn decode_rle_literal_run_then_next_record() {
        // literal run k=1 (covers p=0,1) with values [3,4], then constant run for p=2 value 9
        let data = [0x01u8, 3, 4, 0x80u8, 9];
        assert_eq!(decode_rle_value(&data, 0).unwrap(), 3);
        assert_eq!(decode_rle_value(&data, 1).unwrap(), 4);
        assert_eq!(decode_rle_value(&data, 2).unwrap(), 9);
    }
}
