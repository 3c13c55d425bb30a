//! Bitmap and pixmap fragment composition, plus the fragment-kind dispatcher.
//!
//! Port of the bitmap/pixmap branches of `ssfn_render` in `ssfn.h`. Both fragment
//! kinds are decoded into the same 8-bit indexed glyph buffer that the contour
//! rasterizer draws into, so a character's fragment list can freely mix vector and
//! raster layers.

use crate::error::{Error, Result};
use crate::style::ITALIC_DIV;

/// Fragment kind, read from the top bits of the fragment's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Contour,
    Bitmap,
    Pixmap,
    KerningGroup,
}

impl FragmentKind {
    pub fn classify(b0: u8) -> Result<FragmentKind> {
        if b0 & 0xC0 == 0x00 {
            Ok(FragmentKind::Contour)
        } else if b0 & 0xE0 == 0x80 {
            Ok(FragmentKind::Bitmap)
        } else if b0 & 0xE0 == 0xA0 {
            Ok(FragmentKind::Pixmap)
        } else if b0 & 0xE0 == 0xC0 {
            Ok(FragmentKind::KerningGroup)
        } else {
            Err(Error::BadFile)
        }
    }
}

/// Parameters shared by both raster fragment kinds.
pub struct RasterParams {
    pub xoffs: u8,
    pub yoffs: u8,
    pub color: u8,
    pub font_height: u32,
    pub render_height: u32,
    pub bold_cb: i32,
    pub italic: bool,
    pub smooth_aa: bool,
}

fn get_bit(row: &[u8], x: usize) -> bool {
    (row[x / 8] >> (x % 8)) & 1 != 0
}

/// Decode and stamp a `100xxxxx` bitmap fragment into the glyph buffer.
pub fn compose_bitmap(
    data: &[u8],
    p: &RasterParams,
    buffer: &mut [u8],
    pitch: usize,
    height: usize,
) -> Result<()> {
    let b0 = *data.first().ok_or(Error::BadFile)?;
    let b1 = *data.get(1).ok_or(Error::BadFile)?;
    let src_w = ((b0 & 0x1F) as u32 + 1) * 8;
    let src_h = b1 as u32 + 1;
    let row_bytes = (src_w / 8) as usize;
    let rows = data.get(2..2 + row_bytes * src_h as usize).ok_or(Error::BadFile)?;

    let dst_w = (src_w * p.render_height / p.font_height).max(1);
    let dst_h = (src_h * p.render_height / p.font_height).max(1);

    for j in 0..dst_h {
        let sy = (j * src_h / dst_h) as usize;
        let row = &rows[sy * row_bytes..(sy + 1) * row_bytes];
        for i in 0..dst_w {
            let sx = (i * src_w / dst_w) as usize;
            if !get_bit(row, sx) {
                continue;
            }
            let mut x = p.xoffs as i32 + i as i32;
            let y = p.yoffs as i32 + j as i32;
            if p.italic {
                x += (height as i32 - y) / ITALIC_DIV;
            }
            stamp(buffer, pitch, height, x, y, p.color, p.bold_cb);
        }
    }

    if p.smooth_aa && p.render_height > p.font_height + 4 {
        smooth_outline(buffer, pitch, height, p.color);
    }
    Ok(())
}

fn stamp(buffer: &mut [u8], pitch: usize, height: usize, x: i32, y: i32, color: u8, bold_cb: i32) {
    if y < 0 || y as usize >= height {
        return;
    }
    for xx in x..=(x + bold_cb) {
        if xx < 0 || xx as usize >= pitch {
            continue;
        }
        buffer[y as usize * pitch + xx as usize] = color;
    }
}

fn smooth_outline(buffer: &mut [u8], pitch: usize, height: usize, color: u8) {
    if pitch < 3 || height < 3 {
        return;
    }
    let secondary = if color == 0xFD { 0xFC } else { 0xFD };
    let mut tagged = Vec::new();
    for y in 1..height - 1 {
        for x in 1..pitch - 1 {
            if buffer[y * pitch + x] != 0xFF {
                continue;
            }
            let vertical = buffer[(y - 1) * pitch + x] == color || buffer[(y + 1) * pitch + x] == color;
            let horizontal = buffer[y * pitch + x - 1] == color || buffer[y * pitch + x + 1] == color;
            if vertical && horizontal {
                tagged.push(y * pitch + x);
            }
        }
    }
    for idx in tagged {
        buffer[idx] = secondary;
    }
    for cell in buffer.iter_mut() {
        if *cell == secondary {
            *cell = color;
        }
    }
}

/// Decode a `101xxxxx` RLE pixmap and nearest-neighbor upsample it into the glyph
/// buffer. Pixmap cells already carry explicit color-map indices (or `0xFF`
/// transparent), so `p.color` is unused here.
pub fn compose_pixmap(
    data: &[u8],
    p: &RasterParams,
    buffer: &mut [u8],
    pitch: usize,
    height: usize,
) -> Result<()> {
    let b0 = *data.first().ok_or(Error::BadFile)?;
    let b1 = *data.get(1).ok_or(Error::BadFile)?;
    let b2 = *data.get(2).ok_or(Error::BadFile)?;
    let b3 = *data.get(3).ok_or(Error::BadFile)?;
    let rle_len = ((((b0 & 0x1F) as usize) << 8) | b1 as usize) + 1;
    let src_w = b2 as u32 + 1;
    let src_h = b3 as u32 + 1;
    let rle = data.get(4..4 + rle_len).ok_or(Error::BadFile)?;

    let mut raster = Vec::with_capacity((src_w * src_h) as usize);
    let mut pos = 0usize;
    let target = (src_w * src_h) as usize;
    while raster.len() < target {
        let c = *rle.get(pos).ok_or(Error::BadFile)?;
        pos += 1;
        let run = (c & 0x7F) as usize + 1;
        if c & 0x80 != 0 {
            let val = *rle.get(pos).ok_or(Error::BadFile)?;
            pos += 1;
            for _ in 0..run {
                raster.push(val);
            }
        } else {
            let lit = rle.get(pos..pos + run).ok_or(Error::BadFile)?;
            raster.extend_from_slice(lit);
            pos += run;
        }
    }
    raster.truncate(target);

    let dst_w = (src_w * p.render_height / p.font_height).max(1);
    let dst_h = (src_h * p.render_height / p.font_height).max(1);
    for j in 0..dst_h {
        let sy = j * src_h / dst_h;
        for i in 0..dst_w {
            let sx = i * src_w / dst_w;
            let val = raster[(sy * src_w + sx) as usize];
            if val == 0xFF {
                continue;
            }
            let mut x = p.xoffs as i32 + i as i32;
            let y = p.yoffs as i32 + j as i32;
            if p.italic {
                x += (height as i32 - y) / ITALIC_DIV;
            }
            if y < 0 || y as usize >= height || x < 0 || x as usize >= pitch {
                continue;
            }
            buffer[y as usize * pitch + x as usize] = val;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> RasterParams {
        RasterParams {
            xoffs: 0,
            yoffs: 0,
            color: 3,
            font_height: 8,
            render_height: 8,
            bold_cb: 0,
            italic: false,
            smooth_aa: false,
        }
    }

    #[test]
    fn classifies_fragment_kinds() {
        assert_eq!(FragmentKind::classify(0x05).unwrap(), FragmentKind::Contour);
        assert_eq!(FragmentKind::classify(0x80).unwrap(), FragmentKind::Bitmap);
        assert_eq!(FragmentKind::classify(0xA0).unwrap(), FragmentKind::Pixmap);
        assert_eq!(FragmentKind::classify(0xC0).unwrap(), FragmentKind::KerningGroup);
    }

    #[test]
    fn bitmap_stamps_set_bits() {
        // width = ((0 & 0x1F)+1)*8 = 8, height = 0+1 = 1, one row, bit 0 set (LSB-first).
        let data = [0x80u8, 0x00, 0b0000_0001];
        let mut buf = vec![0xFFu8; 8 * 8];
        let p = base_params();
        compose_bitmap(&data, &p, &mut buf, 8, 8).unwrap();
        assert_eq!(buf[0], 3);
        assert_eq!(buf[1], 0xFF);
    }

    #[test]
    fn pixmap_literal_run_decodes() {
        // 2x1 pixmap, literal run of 2 bytes: [5, 7]
        let rle_len = 3usize; // control byte + 2 literal bytes
        let data = [
            0xA0u8,
            (rle_len - 1) as u8,
            1, // width - 1 -> width 2
            0, // height - 1 -> height 1
            0x01, // control: literal, run length 2
            5,
            7,
        ];
        let mut buf = vec![0xFFu8; 8 * 8];
        let mut p = base_params();
        p.font_height = 1;
        p.render_height = 1;
        compose_pixmap(&data, &p, &mut buf, 8, 8).unwrap();
        assert_eq!(buf[0], 5);
        assert_eq!(buf[1], 7);
    }

    #[test]
    fn pixmap_repeat_run_decodes() {
        let data = [0xA0u8, 1, 2, 0, 0x83u8, 9]; // control: repeat, run 4, value 9, width 3 height1
        let mut buf = vec![0xFFu8; 8 * 8];
        let mut p = base_params();
        p.font_height = 1;
        p.render_height = 1;
        compose_pixmap(&data, &p, &mut buf, 8, 8).unwrap();
        assert_eq!(buf[0], 9);
        assert_eq!(buf[1], 9);
        assert_eq!(buf[2], 9);
    }
}
