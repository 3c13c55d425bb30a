//! The renderer context: ties the registry, selection, glyph cache, and blitter
//! together behind the public `load`/`select`/`render`/`mem`/`free` operations.
//!
//! Port of the `ssfn_t` context struct and the top-level entry points in `ssfn.h`.
//! Where the original holds raw pointers into a process-wide struct, this holds
//! owned `Registry`/`GlyphCache` fields with normal Rust ownership — `Drop` plays
//! the role of `ssfn_free`.

use crate::blit::{self, ColorResolver};
use crate::dest::DestBuffer;
use crate::error::{Error, Result};
use crate::font_format::FontImage;
use crate::glyph::{self, GlyphCache, RasterizedGlyph};
use crate::kerning;
use crate::registry::{Registry, Selection};
use crate::style::{Family, StyleFlags, SIZE_MAX, SIZE_MIN};

/// Dimensions and placement a render/measure pass needs for one glyph.
struct Placement {
    consumed: usize,
    codepoint: u32,
    font_idx: Option<usize>,
    w_display: i32,
    h_display: i32,
    origin_x: i32,
    origin_y: i32,
    advance_x: i32,
    advance_y: i32,
}

/// The renderer context. Holds every font loaded via `load`, the active selection,
/// and the codepoint-keyed glyph cache for that selection.
#[derive(Default)]
pub struct Context {
    registry: Registry,
    selection: Option<Selection>,
    cache: GlyphCache,
}

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    /// Load a font image (gzip-wrapped, a collection, or a bare SSFN2 image) and
    /// register every font found in it.
    pub fn load(&mut self, data: &[u8]) -> Result<()> {
        self.registry.load(data)?;
        Ok(())
    }

    /// Select the active family/style/size for subsequent renders. Clears the
    /// glyph cache, since cached glyphs are only valid for the selection they were
    /// rasterized under.
    pub fn select(&mut self, family: Family, name: Option<&str>, style_bits: u32, size: u32) -> Result<()> {
        let style = StyleFlags::new(style_bits).ok_or(Error::BadStyle)?;
        if size < SIZE_MIN || size > SIZE_MAX {
            return Err(Error::BadSize);
        }
        let named_font = match family {
            Family::ByName => {
                let name = name.ok_or(Error::InvInp)?;
                Some(self.registry.find_by_name(name).ok_or(Error::NoFace)?)
            }
            Family::Any => None,
            _ => {
                let bucket = family.bucket().ok_or(Error::InvInp)?;
                if self.registry.family_fonts(bucket).is_empty() {
                    return Err(Error::NoFace);
                }
                None
            }
        };
        self.selection = Some(Selection { family, style, size, named_font });
        self.cache.clear();
        Ok(())
    }

    /// Total bytes owned by the loaded fonts (spec.md §4.1 `Mem`).
    pub fn mem(&self) -> usize {
        self.registry.mem()
    }

    /// Release every loaded font, the cache, and the current selection.
    pub fn free(&mut self) {
        self.registry.clear();
        self.cache.clear();
        self.selection = None;
    }

    fn resolve_codepoint(&self, text: &str, selection: &Selection) -> (u32, usize) {
        let candidates: Vec<usize> = match selection.named_font {
            Some(idx) => vec![idx],
            None => match selection.family.bucket() {
                Some(b) => self.registry.family_fonts(b).to_vec(),
                None => (0..Family::COUNT).flat_map(|b| self.registry.family_fonts(b).to_vec()).collect(),
            },
        };
        for idx in candidates {
            if let Some((cp, len)) = self.registry.font(idx).match_ligature(text) {
                return (cp, len);
            }
        }
        FontImage::decode_codepoint(text)
    }

    fn glyph_for(&mut self, font_idx: usize, codepoint: u32, style: StyleFlags, size: u32) -> Result<()> {
        if self.cache.get(codepoint).is_some() {
            return Ok(());
        }
        let font = self.registry.font(font_idx);
        let rec = font
            .find_character(codepoint)
            .or_else(|| font.first_default_glyph())
            .ok_or(Error::NoGlyph)?;
        let rasterized = glyph::rasterize(&font, rec, style, font.font_style(), size)?;
        self.cache.insert(codepoint, rasterized);
        Ok(())
    }

    fn display_height(&self, font: &FontImage, selection: &Selection) -> u32 {
        if selection.style.has(StyleFlags::ABS_SIZE) || font.family() == Family::Monospace || font.baseline() == 0 {
            selection.size
        } else {
            selection.size * font.height() as u32 / font.baseline() as u32
        }
    }

    /// Shared step for `render` and `bbox`: resolve the next codepoint, rasterize
    /// (caching) its glyph, and compute its display-space placement and advance.
    fn step(&mut self, text: &str, cursor_x: i32, cursor_y: i32) -> Result<Option<Placement>> {
        if text.is_empty() {
            return Ok(None);
        }
        let selection = self.selection.ok_or(Error::InvInp)?;
        let (codepoint, consumed) = self.resolve_codepoint(text, &selection);
        let font_idx = selection.resolve_for(&self.registry, codepoint);
        let font_idx = match font_idx {
            Some(idx) => idx,
            None => {
                return if selection.style.has(StyleFlags::NODEFGLYPH) {
                    Err(Error::NoGlyph)
                } else {
                    Ok(Some(Placement {
                        consumed,
                        codepoint,
                        font_idx: None,
                        w_display: 0,
                        h_display: 0,
                        origin_x: cursor_x,
                        origin_y: cursor_y,
                        advance_x: 0,
                        advance_y: 0,
                    }))
                };
            }
        };
        self.glyph_for(font_idx, codepoint, selection.style, selection.size)?;
        let font = self.registry.font(font_idx);
        let h_display = self.display_height(&font, &selection) as i32;
        let glyph = self.cache.get(codepoint).expect("just inserted");
        let font_height = font.height() as i32;
        let w_display = if selection.style.has(StyleFlags::NOAA) {
            glyph.pitch as i32
        } else {
            glyph.pitch as i32 * h_display / glyph.height as i32
        };
        let overlap_scaled = glyph.overlap as i32 * h_display / font_height;
        let origin_x = if glyph.adv_x > 0 {
            cursor_x - overlap_scaled
        } else {
            cursor_x - w_display / 2
        };
        let ascent_scaled = glyph.ascent * h_display / font_height;
        let origin_y = cursor_y - ascent_scaled;
        let advance_x = (glyph.adv_x as i32 - glyph.overlap as i32) * h_display / font_height;
        let advance_y = glyph.adv_y as i32 * h_display / font_height;
        Ok(Some(Placement {
            consumed,
            codepoint,
            font_idx: Some(font_idx),
            w_display,
            h_display,
            origin_x,
            origin_y,
            advance_x,
            advance_y,
        }))
    }

    /// Render the next character of `text` into `dst` at the destination's cursor,
    /// advancing the cursor (and applying kerning against the following codepoint).
    /// Returns the number of UTF-8 bytes consumed; `0` means end of string.
    pub fn render(&mut self, dst: &mut DestBuffer, text: &str) -> Result<usize> {
        let selection = self.selection.ok_or(Error::InvInp)?;
        let placement = match self.step(text, dst.cursor_x, dst.cursor_y)? {
            Some(p) => p,
            None => return Ok(0),
        };
        if let Some(font_idx) = placement.font_idx {
            let font = self.registry.font(font_idx);
            let glyph = self.cache.get(placement.codepoint).expect("rasterized above");
            let resolver: &dyn ColorResolver = &|idx: u8| font.cmap_color(idx);
            blit::blit_glyph(glyph, resolver, dst, placement.w_display, placement.h_display, placement.origin_x, placement.origin_y);

            if selection.style.has(StyleFlags::STHROUGH) {
                let cb = (placement.h_display / 2).max(1) / 16 + 1;
                blit::strike_through(dst, placement.origin_x, placement.w_display, dst.cursor_y + placement.h_display / 2 - cb, cb);
            }
            if selection.style.has(StyleFlags::UNDERLINE) {
                let font_height = font.height() as i32;
                let u_y = dst.cursor_y + font.underline() as i32 * placement.h_display / font_height;
                let cb = (placement.h_display / 16).max(1);
                let inked: Vec<bool> = (0..glyph.pitch).map(|x| glyph.buffer[x] != 0xFF).collect();
                blit::underline(dst, placement.origin_x, placement.w_display, u_y, cb, &inked);
            }
        }

        dst.cursor_x += placement.advance_x;
        dst.cursor_y += placement.advance_y;

        if let Some(font_idx) = placement.font_idx {
            let rest = &text[placement.consumed..];
            if !rest.is_empty() && !selection.style.has(StyleFlags::NOKERN) {
                let font = self.registry.font(font_idx);
                if font.has_kerning() {
                    let (next_cp, _) = self.resolve_codepoint(rest, &selection);
                    if next_cp > 32 {
                        if let Some(rec) = font.find_character(placement.codepoint) {
                            if let Some((value, horizontal)) = kerning::lookup(&font, rec, next_cp) {
                                let scaled = value * placement.h_display / font.height() as i32;
                                if horizontal {
                                    dst.cursor_x += scaled;
                                } else {
                                    dst.cursor_y += scaled;
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(placement.consumed)
    }

    /// Dry-run the layout of `text`, accumulating a bounding box without writing
    /// any pixels. Returns `(width, height, left, top)`.
    pub fn bbox(&mut self, text: &str) -> Result<(u32, u32, i32, i32)> {
        let (mut x, mut y) = (0i32, 0i32);
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        let mut rest = text;
        let mut any = false;
        while !rest.is_empty() {
            let placement = match self.step(rest, x, y)? {
                Some(p) => p,
                None => break,
            };
            if placement.font_idx.is_some() {
                any = true;
                min_x = min_x.min(placement.origin_x);
                min_y = min_y.min(placement.origin_y);
                max_x = max_x.max(placement.origin_x + placement.w_display);
                max_y = max_y.max(placement.origin_y + placement.h_display);
            }
            x += placement.advance_x;
            y += placement.advance_y;
            if placement.consumed == 0 {
                break;
            }
            rest = &rest[placement.consumed..];
        }
        if !any {
            return Ok((0, 0, 0, 0));
        }
        Ok(((max_x - min_x) as u32, (max_y - min_y) as u32, min_x, min_y))
    }

    /// Allocate a fresh ARGB buffer sized to `bbox(text)` and render `text` into it
    /// with `fg` as foreground and a transparent background.
    pub fn text(&mut self, text: &str, fg: u32) -> Result<(Vec<u8>, u32, u32)> {
        let (w, h, left, top) = self.bbox(text)?;
        if w == 0 || h == 0 {
            return Ok((Vec::new(), 0, 0));
        }
        let mut pixels = vec![0u8; (w * h * 4) as usize];
        {
            let mut dst = DestBuffer::new(&mut pixels, w as i32, h as i32, w as usize * 4);
            dst.fg = fg;
            dst.bg = 0x0000_0000;
            dst.cursor_x = -left;
            dst.cursor_y = -top;
            let mut rest = text;
            loop {
                let consumed = self.render(&mut dst, rest)?;
                if consumed == 0 {
                    break;
                }
                rest = &rest[consumed..];
            }
        }
        Ok((pixels, w, h))
    }
}
