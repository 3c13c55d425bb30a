//! Box-filter downscale and alpha-blend blit of a cached glyph into the destination
//! buffer, plus underline and strike-through synthesis.
//!
//! Port of the scaling loop in `ssfn_render`. Kept as a box filter with an 8-bit
//! fixed-point accumulator rather than switching to a general resampling filter,
//! since spec scenario "Scaler idempotence at unity" depends on this exact
//! degenerate-to-copy behavior when the cache and display sizes match.

use crate::dest::DestBuffer;
use crate::glyph::RasterizedGlyph;

/// Resolves a glyph cell's color index to an explicit ARGB color. `0xFF` is
/// background, `0xFE` is foreground; both are supplied by the destination buffer
/// rather than this function, since only the caller knows `dst.fg`/`dst.bg`.
pub trait ColorResolver {
    fn resolve(&self, index: u8) -> Option<u32>;
}

impl<F: Fn(u8) -> Option<u32>> ColorResolver for F {
    fn resolve(&self, index: u8) -> Option<u32> {
        self(index)
    }
}

fn cell_color(index: u8, fg: u32, bg: u32, cmap: &dyn ColorResolver) -> Option<u32> {
    match index {
        0xFF => Some(bg),
        0xFE => Some(fg),
        _ => cmap.resolve(index).or(Some(fg)),
    }
}

/// Overlap, in 8.8 fixed-point units, between source pixel `p` and the continuous
/// range `[lo, hi)` (also in 8.8 units). Always in `[0, 256]`.
fn overlap(p: i32, lo: i32, hi: i32) -> i32 {
    let p_lo = p << 8;
    let p_hi = p_lo + 256;
    (hi.min(p_hi) - lo.max(p_lo)).clamp(0, 256)
}

/// Box-filter a `[x0, x1) x [y0, y1)` source rectangle (8.8 fixed point, clamped
/// into the glyph) down to one destination sample.
fn sample(glyph: &RasterizedGlyph, fg: u32, bg: u32, cmap: &dyn ColorResolver, x0: i32, x1: i32, y0: i32, y1: i32) -> Option<(u8, u8, u8, u8)> {
    let sx0 = (x0 >> 8).max(0);
    let sx1 = ((x1 - 1) >> 8).min(glyph.pitch as i32 - 1);
    let sy0 = (y0 >> 8).max(0);
    let sy1 = ((y1 - 1) >> 8).min(glyph.height as i32 - 1);
    if sx1 < sx0 || sy1 < sy0 {
        return None;
    }
    let (mut a, mut r, mut g, mut b, mut wsum) = (0i64, 0i64, 0i64, 0i64, 0i64);
    for sy in sy0..=sy1 {
        let wy = overlap(sy, y0, y1);
        if wy == 0 {
            continue;
        }
        let row = &glyph.buffer[sy as usize * glyph.pitch..(sy as usize + 1) * glyph.pitch];
        for sx in sx0..=sx1 {
            let wx = overlap(sx, x0, x1);
            if wx == 0 {
                continue;
            }
            let w = (wx * wy) as i64;
            let color = match cell_color(row[sx as usize], fg, bg, cmap) {
                Some(c) => c,
                None => continue,
            };
            a += w * ((color >> 24) & 0xFF) as i64;
            r += w * ((color >> 16) & 0xFF) as i64;
            g += w * ((color >> 8) & 0xFF) as i64;
            b += w * (color & 0xFF) as i64;
            wsum += w;
        }
    }
    if wsum == 0 {
        return None;
    }
    Some(((a / wsum) as u8, (r / wsum) as u8, (g / wsum) as u8, (b / wsum) as u8))
}

/// Blit one cached glyph at display size `w_display x h_display`, top-left anchored
/// at `(origin_x, origin_y)` in destination pixel space.
pub fn blit_glyph(
    glyph: &RasterizedGlyph,
    cmap: &dyn ColorResolver,
    dst: &mut DestBuffer,
    w_display: i32,
    h_display: i32,
    origin_x: i32,
    origin_y: i32,
) {
    if w_display <= 0 || h_display <= 0 {
        return;
    }
    let pitch = glyph.pitch as i32;
    let cache_h = glyph.height as i32;
    for y in 0..h_display {
        let dst_y = origin_y + y;
        if dst_y < 0 || dst_y >= dst.height {
            continue;
        }
        let y0 = (y << 8) * cache_h / h_display;
        let y1 = ((y + 1) << 8) * cache_h / h_display;
        for x in 0..w_display {
            let dst_x = origin_x + x;
            if dst_x < 0 || dst_x >= dst.width() {
                continue;
            }
            let x0 = (x << 8) * pitch / w_display;
            let x1 = ((x + 1) << 8) * pitch / w_display;
            if let Some((a, r, g, b)) = sample(glyph, dst.fg, dst.bg, cmap, x0, x1, y0, y1) {
                dst.blend(dst_x, dst_y, a, r, g, b);
            }
        }
    }
}

/// Force a horizontal band `[y_top, y_top + thickness)` to `dst.fg`, used for
/// strike-through.
pub fn strike_through(dst: &mut DestBuffer, origin_x: i32, w_display: i32, y_top: i32, thickness: i32) {
    let fg = dst.fg;
    let (fa, fr, fg_c, fb) = (
        ((fg >> 24) & 0xFF) as u8,
        ((fg >> 16) & 0xFF) as u8,
        ((fg >> 8) & 0xFF) as u8,
        (fg & 0xFF) as u8,
    );
    for y in y_top..y_top + thickness {
        for x in origin_x..origin_x + w_display {
            dst.blend(x, y, fa, fr, fg_c, fb);
        }
    }
}

/// Underline a glyph cell, skipping columns that already carried ink on the glyph's
/// top inked row (`inked_columns`), producing a break around descenders.
pub fn underline(
    dst: &mut DestBuffer,
    origin_x: i32,
    w_display: i32,
    y_top: i32,
    thickness: i32,
    inked_columns: &[bool],
) {
    let fg = dst.fg;
    let (fa, fr, fg_c, fb) = (
        ((fg >> 24) & 0xFF) as u8,
        ((fg >> 16) & 0xFF) as u8,
        ((fg >> 8) & 0xFF) as u8,
        (fg & 0xFF) as u8,
    );
    for y in y_top..y_top + thickness {
        for x in 0..w_display {
            if inked_columns.get(x as usize).copied().unwrap_or(false) {
                continue;
            }
            dst.blend(origin_x + x, y, fa, fr, fg_c, fb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_glyph(pitch: usize, height: usize) -> RasterizedGlyph {
        RasterizedGlyph {
            pitch,
            height,
            overlap: 0,
            adv_x: pitch as u8,
            adv_y: 0,
            ascent: height as i32,
            descent: 0,
            buffer: vec![0xFEu8; pitch * height],
        }
    }

    fn no_cmap() -> impl ColorResolver {
        |_: u8| None
    }

    #[test]
    fn unity_scale_is_identity_copy() {
        let glyph = solid_glyph(4, 4);
        let mut buf = vec![0u8; 4 * 4 * 4];
        let mut dst = DestBuffer::new(&mut buf, 4, 4, 16);
        dst.fg = 0xFF010203;
        dst.bg = 0x00000000;
        blit_glyph(&glyph, &no_cmap(), &mut dst, 4, 4, 0, 0);
        for chunk in buf.chunks_exact(4) {
            assert_eq!(chunk, &[0x01, 0x02, 0x03, 0xFF][..]);
        }
    }

    #[test]
    fn out_of_bounds_origin_clips_silently() {
        let glyph = solid_glyph(2, 2);
        let mut buf = vec![5u8; 2 * 2 * 4];
        let mut dst = DestBuffer::new(&mut buf, 2, 2, 8);
        dst.fg = 0xFFFFFFFF;
        blit_glyph(&glyph, &no_cmap(), &mut dst, 2, 2, 10, 10);
        assert!(buf.iter().all(|&b| b == 5));
    }
}
