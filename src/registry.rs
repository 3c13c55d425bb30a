//! Font registry (fonts grouped by family bucket) and the best-match selection
//! algorithm.
//!
//! Port of the linked family lists walked by `ssfn_select`/`ssfn_render` in
//! `ssfn.h`. Fonts are stored as owned byte buffers (see `loader.rs`) and bucketed
//! by `Family::bucket()` at load time; `ByName`/`Any` are selection-time concepts
//! only and never bucket a font themselves.

use crate::error::{Error, Result};
use crate::font_format::FontImage;
use crate::loader;
use crate::style::{Family, StyleFlags};

#[derive(Default)]
pub struct Registry {
    fonts: Vec<Vec<u8>>,
    buckets: [Vec<usize>; Family::COUNT],
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Load and register every font image found in `data` (gzip/collection-aware).
    pub fn load(&mut self, data: &[u8]) -> Result<usize> {
        let images = loader::load_images(data)?;
        let count = images.len();
        for image in images {
            self.add(image)?;
        }
        Ok(count)
    }

    fn add(&mut self, data: Vec<u8>) -> Result<()> {
        let bucket = FontImage::parse(&data)?.family().bucket().ok_or(Error::BadFile)?;
        let idx = self.fonts.len();
        self.fonts.push(data);
        self.buckets[bucket].push(idx);
        Ok(())
    }

    pub fn font(&self, idx: usize) -> FontImage<'_> {
        FontImage::parse(&self.fonts[idx]).expect("registered fonts are pre-validated")
    }

    pub fn family_fonts(&self, bucket: usize) -> &[usize] {
        &self.buckets[bucket]
    }

    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.fonts
            .iter()
            .position(|data| FontImage::parse(data).map(|f| f.name().starts_with(name)).unwrap_or(false))
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Total bytes owned by the registry (spec.md §4.1 `Mem`).
    pub fn mem(&self) -> usize {
        self.fonts.iter().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.fonts.clear();
        for b in &mut self.buckets {
            b.clear();
        }
    }
}

/// The active `(family, style, size[, named font])` selection. Resolution at render
/// time follows spec.md §4.1's best-match fallback ladder.
#[derive(Clone, Copy)]
pub struct Selection {
    pub family: Family,
    pub style: StyleFlags,
    pub size: u32,
    pub named_font: Option<usize>,
}

impl Selection {
    fn candidate_buckets(family: Family) -> Vec<usize> {
        match family.bucket() {
            Some(b) => vec![b],
            None => (0..Family::COUNT).collect(),
        }
    }

    /// Resolve the font to use for `codepoint`, per the five-step fallback ladder.
    pub fn resolve_for(&self, registry: &Registry, codepoint: u32) -> Option<usize> {
        if let Some(idx) = self.named_font {
            return Some(idx);
        }
        if let Some(idx) = self.best_match(registry, self.family, codepoint) {
            return Some(idx);
        }
        if self.family.bucket().is_some() {
            if let Some(idx) = self.best_match(registry, Family::Any, codepoint) {
                return Some(idx);
            }
        }
        if !self.style.has(StyleFlags::NODEFGLYPH) {
            return self.default_glyph_font(registry);
        }
        None
    }

    fn best_match(&self, registry: &Registry, family: Family, codepoint: u32) -> Option<usize> {
        let buckets = Self::candidate_buckets(family);
        let wants_bold = self.style.has(StyleFlags::BOLD);
        let wants_italic = self.style.has(StyleFlags::ITALIC);

        if wants_bold || wants_italic {
            for &b in &buckets {
                for &idx in registry.family_fonts(b) {
                    let font = registry.font(idx);
                    let fs = font.font_style();
                    if fs.bold == wants_bold && fs.italic == wants_italic && font.find_character(codepoint).is_some() {
                        return Some(idx);
                    }
                }
            }
            if wants_bold && wants_italic {
                for &b in &buckets {
                    for &idx in registry.family_fonts(b) {
                        let font = registry.font(idx);
                        let fs = font.font_style();
                        if (fs.bold || fs.italic) && font.find_character(codepoint).is_some() {
                            return Some(idx);
                        }
                    }
                }
            }
        }

        for &b in &buckets {
            for &idx in registry.family_fonts(b) {
                if registry.font(idx).find_character(codepoint).is_some() {
                    return Some(idx);
                }
            }
        }
        None
    }

    fn default_glyph_font(&self, registry: &Registry) -> Option<usize> {
        let buckets = Self::candidate_buckets(self.family);
        for b in buckets {
            for &idx in registry.family_fonts(b) {
                if registry.font(idx).first_default_glyph().is_some() {
                    return Some(idx);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font_format::END_MAGIC;
    use crate::font_format::MAGIC;

    fn push_u16(v: &mut Vec<u8>, x: u16) {
        v.extend_from_slice(&x.to_le_bytes());
    }
    fn push_u32(v: &mut Vec<u8>, x: u32) {
        v.extend_from_slice(&x.to_le_bytes());
    }

    fn make_font(family: u8, codepoint: u16) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(MAGIC);
        push_u32(&mut v, 0);
        v.push(family);
        v.push(0);
        v.push(10);
        v.push(16);
        v.push(12);
        v.push(14);
        push_u16(&mut v, 33);
        push_u32(&mut v, 40);
        push_u32(&mut v, 0);
        push_u32(&mut v, 0);
        push_u32(&mut v, 0);
        v.push(0);
        while v.len() < 33 {
            v.push(0);
        }
        let hi = 0xC0 | ((codepoint >> 8) & 0x3F) as u8;
        let lo = (codepoint & 0xFF) as u8;
        v.push(hi);
        v.push(lo);
        v.extend_from_slice(&[0, 0, 8, 16, 9, 0]);
        let size = v.len() as u32 + 4;
        v.extend_from_slice(END_MAGIC);
        v[4..8].copy_from_slice(&size.to_le_bytes());
        v
    }

    #[test]
    fn registers_font_under_family_bucket() {
        let mut reg = Registry::new();
        reg.load(&make_font(1, 65)).unwrap();
        assert_eq!(reg.family_fonts(1).len(), 1);
        assert_eq!(reg.family_fonts(0).len(), 0);
    }

    #[test]
    fn resolves_first_font_with_glyph() {
        let mut reg = Registry::new();
        reg.load(&make_font(1, 65)).unwrap();
        let sel = Selection { family: Family::Sans, style: StyleFlags::empty(), size: 16, named_font: None };
        assert!(sel.resolve_for(&reg, 65).is_some());
        // Codepoint 66 has no record and the fixture's first table entry is a skip
        // code (not a record), so there is no default glyph to fall back to either.
        assert!(sel.resolve_for(&reg, 66).is_none());
    }

    #[test]
    fn any_family_falls_back_across_buckets() {
        let mut reg = Registry::new();
        reg.load(&make_font(0, 65)).unwrap();
        let sel = Selection { family: Family::Sans, style: StyleFlags::empty(), size: 16, named_font: None };
        // No sans font has 'A', but the Any rescan should find the serif one.
        assert!(sel.resolve_for(&reg, 65).is_some());
    }
}
