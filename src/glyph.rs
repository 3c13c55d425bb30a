//! Per-codepoint glyph rasterization and the glyph cache.
//!
//! Port of the per-glyph assembly loop in `ssfn_render` (walking a character's
//! fragment list, applying the current color, bold/italic synthesis) and of the
//! cache lookup that `_ssfn_c`'s caller performs before rasterizing. The original's
//! three-level nullable-array cache is replaced by a `HashMap`, licensed by the
//! accompanying design notes: a sparse `u32 -> owned glyph` mapping is equivalent
//! and simpler, and Latin-text locality was never measured to matter here.

use std::collections::HashMap;

use crate::contour::{self, Transform};
use crate::error::Result;
use crate::font_format::{CharRecord, FontImage, FragmentEntry};
use crate::fragment::{self, FragmentKind, RasterParams};
use crate::style::{FontStyle, StyleFlags};

/// One rasterized glyph: an 8-bit color-indexed bitmap at the font's native height,
/// plus the metrics the blitter and kerning resolver need. Cells hold `0xFF`
/// background, `0xFE` foreground, or a color-map index.
#[derive(Clone)]
pub struct RasterizedGlyph {
    pub pitch: usize,
    pub height: usize,
    pub overlap: u8,
    pub adv_x: u8,
    pub adv_y: u8,
    pub ascent: i32,
    pub descent: i32,
    pub buffer: Vec<u8>,
}

impl RasterizedGlyph {
    fn blank(pitch: usize, height: usize, overlap: u8, adv_x: u8, adv_y: u8, ascent: i32) -> RasterizedGlyph {
        RasterizedGlyph {
            pitch,
            height,
            overlap,
            adv_x,
            adv_y,
            ascent,
            descent: 0,
            buffer: vec![0xFFu8; pitch * height],
        }
    }

    fn update_descent(&mut self) {
        for row in (0..self.height).rev() {
            let has_ink = self.buffer[row * self.pitch..(row + 1) * self.pitch]
                .iter()
                .any(|&c| c != 0xFF);
            if has_ink {
                self.descent = (self.height - row) as i32;
                return;
            }
        }
        self.descent = 0;
    }
}

/// Rasterize one character record's fragment list into a fresh glyph, applying bold
/// and italic synthesis when requested but not already carried by the font.
///
/// `size` is the raw requested size from the active selection (ssfn.h's `ctx->size`).
/// The cache is rasterized at `render_height`, not necessarily `font.height()`: when
/// `NOAA` is set the cache is built directly at `size`; otherwise it is built at
/// `font.height()` unless `size` exceeds it, in which case the cache is
/// supersampled at `size` rounded up to a multiple of 4, and the blitter downsamples
/// from there.
pub fn rasterize(
    font: &FontImage,
    rec: CharRecord,
    style: StyleFlags,
    font_style: FontStyle,
    size: u32,
) -> Result<RasterizedGlyph> {
    let font_height = font.height() as u32;
    let bold_synth = style.has(StyleFlags::BOLD) && !font_style.bold;
    let italic_synth = style.has(StyleFlags::ITALIC) && !font_style.italic;
    let cb = if bold_synth { ((font_height + 64) >> 6) as i32 } else { 0 };

    let render_height = if style.has(StyleFlags::NOAA) {
        size
    } else if size > font_height {
        (size + 4) & !3
    } else {
        font_height
    };

    let pitch = (rec.width() as u32 * render_height / font_height) as usize + (2 * cb.max(0)) as usize;
    let height = (rec.height() as u32 * render_height / font_height) as usize;
    let mut glyph = RasterizedGlyph::blank(
        pitch.max(1),
        height.max(1),
        rec.overlap(),
        rec.advance_x(),
        rec.advance_y(),
        font.baseline() as i32,
    );

    let mut current_color: u8 = 0xFE;
    for entry in rec.fragments() {
        match entry {
            FragmentEntry::Color(c) => current_color = c,
            FragmentEntry::Layer { yoffs, xoffs, fragment_offset } => {
                let data = match font.at(fragment_offset) {
                    Some(d) if !d.is_empty() => d,
                    _ => continue,
                };
                let kind = match FragmentKind::classify(data[0]) {
                    Ok(k) => k,
                    Err(_) => continue,
                };
                match kind {
                    FragmentKind::Contour => {
                        let t = Transform {
                            xoffs: xoffs.wrapping_add(cb.max(0) as u8),
                            yoffs,
                            font_height,
                            render_height,
                            bold_cb: cb,
                            italic: italic_synth,
                        };
                        contour::rasterize_into(
                            data,
                            &t,
                            current_color,
                            &mut glyph.buffer,
                            glyph.pitch,
                            glyph.height,
                        )?;
                    }
                    FragmentKind::Bitmap => {
                        let p = RasterParams {
                            xoffs: xoffs.wrapping_add(cb.max(0) as u8),
                            yoffs,
                            color: current_color,
                            font_height,
                            render_height,
                            bold_cb: cb,
                            italic: italic_synth,
                            smooth_aa: !style.has(StyleFlags::NOAA),
                        };
                        fragment::compose_bitmap(data, &p, &mut glyph.buffer, glyph.pitch, glyph.height)?;
                    }
                    FragmentKind::Pixmap => {
                        let p = RasterParams {
                            xoffs: xoffs.wrapping_add(cb.max(0) as u8),
                            yoffs,
                            color: current_color,
                            font_height,
                            render_height,
                            bold_cb: cb,
                            italic: italic_synth,
                            smooth_aa: false,
                        };
                        fragment::compose_pixmap(data, &p, &mut glyph.buffer, glyph.pitch, glyph.height)?;
                    }
                    FragmentKind::KerningGroup => {
                        // Consumed by the kerning resolver directly from the
                        // character record, not during rasterization.
                    }
                }
            }
        }
    }

    glyph.update_descent();
    Ok(glyph)
}

/// Codepoint-keyed memoization of rasterized glyphs for the current
/// `(font, style, size)` selection. `Select` clears this wholesale.
#[derive(Default)]
pub struct GlyphCache {
    entries: HashMap<u32, RasterizedGlyph>,
}

impl GlyphCache {
    pub fn new() -> GlyphCache {
        GlyphCache::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, codepoint: u32) -> Option<&RasterizedGlyph> {
        self.entries.get(&codepoint)
    }

    pub fn insert(&mut self, codepoint: u32, glyph: RasterizedGlyph) -> &RasterizedGlyph {
        self.entries.entry(codepoint).or_insert(glyph)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_clear_drops_entries() {
        let mut cache = GlyphCache::new();
        let glyph = RasterizedGlyph::blank(1, 1, 0, 1, 0, 0);
        cache.insert(65, glyph);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_get_returns_inserted_glyph() {
        let mut cache = GlyphCache::new();
        let glyph = RasterizedGlyph::blank(3, 4, 1, 9, 0, 6);
        cache.insert(97, glyph);
        let got = cache.get(97).expect("present");
        assert_eq!(got.pitch, 3);
        assert_eq!(got.adv_x, 9);
    }
}
