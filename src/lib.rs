//! # ssfn2-rs
//!
//! Pure Rust renderer for the SSFN2 (Scalable Screen Font) binary format: a single
//! bundle format mixing vector contours, raw bitmaps, and RLE pixmaps in one file,
//! originally designed to render text on bare hardware with no allocator and no
//! floating point.
//!
//! This crate keeps both of the original's usage levels:
//!
//! - [`Context`] — the full renderer: loads font images (optionally gzip-wrapped or
//!   bundled as a collection), resolves the best-matching font for a style/size/
//!   codepoint, rasterizes and caches glyphs, and box-filters them into a caller-owned
//!   ARGB/ABGR destination buffer with kerning, bold/italic synthesis, underline, and
//!   strike-through.
//! - [`console`] — a minimal bitmap-only facade for raw framebuffers, with no
//!   allocation, caching, or anti-aliasing.
//!
//! ## Architecture
//!
//! Font bytes flow through five stages:
//!
//! 1. **Loader** — gzip unwrap, collection split, per-image header validation
//! 2. **Registry** — fonts grouped into family buckets, best-match selection
//! 3. **Glyph rasterizer** — per-fragment decode (contour / bitmap / pixmap) into a
//!    cached canonical-height bitmap
//! 4. **Kerning resolver** — RLE kerning-group lookup between adjacent glyphs
//! 5. **Blitter** — box-filter scale and alpha-blend into the destination buffer

pub mod blit;
pub mod console;
pub mod context;
pub mod contour;
pub mod dest;
pub mod error;
pub mod font_format;
pub mod fragment;
pub mod glyph;
pub mod inflate;
pub mod kerning;
pub mod loader;
pub mod registry;
pub mod style;

pub use context::Context;
pub use dest::DestBuffer;
pub use error::{Error, Result};
pub use style::{Family, FontStyle, StyleFlags, SIZE_MAX, SIZE_MIN};
