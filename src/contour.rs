//! Vector contour fragments: command/coordinate decoding, Bézier flattening, and the
//! even-odd scanline fill.
//!
//! Port of `_ssfn_l`/`_ssfn_b` (edge emission) and the fill loop inside `ssfn_render`
//! in `ssfn.h`. Coordinates are tracked in fixed point with `PREC` fractional bits
//! throughout, matching the original instead of switching to floats, since the fill
//! rule's row/column rounding is part of the format's observable behavior (spec
//! invariant "fill parity").

use crate::error::{Error, Result};
use crate::style::{ITALIC_DIV, PREC};

const MAX_SUBDIVIDE_DEPTH: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cmd {
    Move,
    Line,
    Quad,
    Cubic,
}

impl Cmd {
    fn from_bits(b: u8) -> Cmd {
        match b & 3 {
            0 => Cmd::Move,
            1 => Cmd::Line,
            2 => Cmd::Quad,
            _ => Cmd::Cubic,
        }
    }

    fn tuple_count(self) -> usize {
        match self {
            Cmd::Move | Cmd::Line => 1,
            Cmd::Quad => 2,
            Cmd::Cubic => 3,
        }
    }
}

struct ParsedContour {
    commands: Vec<Cmd>,
    coords: Vec<(u8, u8)>,
}

/// Parse a contour fragment's command stream and raw coordinate tuples. `data` must
/// start at the fragment's kind byte (top bit clear); bit `0x40` is the point-count
/// extension flag, not part of the kind dispatch.
fn parse(data: &[u8]) -> Result<ParsedContour> {
    let b0 = *data.first().ok_or(Error::BadFile)?;
    if b0 & 0x80 != 0 {
        return Err(Error::BadFile);
    }
    let low6 = b0 & 0x3F;
    let (point_count_m1, mut pos) = if b0 & 0x40 != 0 {
        let b1 = *data.get(1).ok_or(Error::BadFile)?;
        (((low6 as u32) << 8) | b1 as u32, 2usize)
    } else {
        (low6 as u32, 1usize)
    };
    let point_count = (point_count_m1 + 1) as usize;
    let cmd_bytes_len = (point_count + 3) / 4;
    let cmd_bytes = data.get(pos..pos + cmd_bytes_len).ok_or(Error::BadFile)?;
    pos += cmd_bytes_len;

    let mut commands = Vec::with_capacity(point_count);
    for i in 0..point_count {
        let byte = cmd_bytes[i / 4];
        let shift = (i % 4) * 2;
        commands.push(Cmd::from_bits(byte >> shift));
    }
    let total_tuples: usize = commands.iter().map(|c| c.tuple_count()).sum();
    let coord_bytes = data.get(pos..pos + total_tuples * 2).ok_or(Error::BadFile)?;
    let mut coords = Vec::with_capacity(total_tuples);
    for t in 0..total_tuples {
        coords.push((coord_bytes[t * 2], coord_bytes[t * 2 + 1]));
    }
    Ok(ParsedContour { commands, coords })
}

/// Per-fragment coordinate transform parameters (spec.md §4.3 "Per-fragment
/// transform").
#[derive(Clone, Copy)]
pub struct Transform {
    pub xoffs: u8,
    pub yoffs: u8,
    pub font_height: u32,
    pub render_height: u32,
    /// Bold dilation slack in display pixels, `0` when not bold-synthesizing.
    pub bold_cb: i32,
    pub italic: bool,
}

impl Transform {
    fn scale_x(&self, c: u8) -> i32 {
        let scaled = (((c as i32 + self.xoffs as i32) << PREC) * self.render_height as i32)
            / self.font_height as i32;
        scaled + (self.bold_cb << PREC)
    }

    fn scale_y(&self, c: u8) -> i32 {
        (((c as i32 + self.yoffs as i32) << PREC) * self.render_height as i32)
            / self.font_height as i32
    }

    fn point(&self, c: (u8, u8)) -> (i32, i32) {
        (self.scale_x(c.0), self.scale_y(c.1))
    }
}

/// The flattened edge polyline, closed, in fixed-point coordinates.
#[derive(Default)]
struct EdgeBuffer {
    points: Vec<(i32, i32)>,
    move_to: Option<(i32, i32)>,
    last: Option<(i32, i32)>,
    width_limit: i32,
    height_limit: i32,
}

impl EdgeBuffer {
    fn clamp(&self, p: (i32, i32)) -> (i32, i32) {
        (p.0.clamp(0, self.width_limit), p.1.clamp(0, self.height_limit))
    }

    fn move_cmd(&mut self, p: (i32, i32)) {
        let p = self.clamp(p);
        self.move_to = Some(p);
        self.last = Some(p);
    }

    fn line_cmd(&mut self, p: (i32, i32)) {
        let p = self.clamp(p);
        if let Some(last) = self.last {
            // Dedup against the last emitted point at rounded integer precision.
            let round = |v: i32| (v + (1 << (PREC - 1))) >> PREC;
            if round(last.0) == round(p.0) && round(last.1) == round(p.1) {
                self.last = Some(p);
                return;
            }
        }
        if self.points.is_empty() {
            if let Some(m) = self.move_to {
                self.points.push(m);
            }
        }
        self.points.push(p);
        self.last = Some(p);
    }

    fn quad_cmd(&mut self, ctrl: (u8, u8), on: (u8, u8), t: &Transform) {
        let last = self.last.unwrap_or((0, 0));
        let ctrl = t.point(ctrl);
        let on = t.point(on);
        let c1 = (last.0 + (ctrl.0 - last.0) / 2, last.1 + (ctrl.1 - last.1) / 2);
        let c2 = (on.0 + (ctrl.0 - on.0) / 2, on.1 + (ctrl.1 - on.1) / 2);
        self.cubic_cmd(c1, c2, on);
    }

    fn cubic_cmd(&mut self, c1: (i32, i32), c2: (i32, i32), on: (i32, i32)) {
        let p0 = self.last.unwrap_or((0, 0));
        self.subdivide(p0, c1, c2, on, MAX_SUBDIVIDE_DEPTH);
    }

    fn subdivide(&mut self, p0: (i32, i32), c1: (i32, i32), c2: (i32, i32), p3: (i32, i32), depth: u32) {
        if depth == 0 {
            self.line_cmd(p3);
            return;
        }
        let mid = |a: (i32, i32), b: (i32, i32)| ((a.0 + b.0) / 2, (a.1 + b.1) / 2);
        let p01 = mid(p0, c1);
        let p12 = mid(c1, c2);
        let p23 = mid(c2, p3);
        let p012 = mid(p01, p12);
        let p123 = mid(p12, p23);
        let p0123 = mid(p012, p123);
        self.subdivide(p0, p01, p012, p0123, depth - 1);
        self.subdivide(p0123, p123, p23, p3, depth - 1);
    }

    fn close(&mut self) {
        if let (Some(m), Some(l)) = (self.move_to, self.last) {
            if m != l {
                self.line_cmd(m);
            }
        }
    }
}

/// Build the closed edge polyline for one contour fragment. Returns an empty buffer
/// (no fill) if the fragment produced fewer than 3 points, per spec.md §4.3.
fn build_edges(data: &[u8], t: &Transform, width_limit: i32, height_limit: i32) -> Result<Vec<(i32, i32)>> {
    let parsed = parse(data)?;
    let mut edges = EdgeBuffer {
        width_limit,
        height_limit,
        ..Default::default()
    };
    let mut ci = 0usize;
    for cmd in &parsed.commands {
        match cmd {
            Cmd::Move => {
                let p = t.point(parsed.coords[ci]);
                edges.move_cmd(p);
                ci += 1;
            }
            Cmd::Line => {
                let p = t.point(parsed.coords[ci]);
                edges.line_cmd(p);
                ci += 1;
            }
            Cmd::Quad => {
                let ctrl = parsed.coords[ci];
                let on = parsed.coords[ci + 1];
                edges.quad_cmd(ctrl, on, t);
                ci += 2;
            }
            Cmd::Cubic => {
                let c1 = t.point(parsed.coords[ci]);
                let c2 = t.point(parsed.coords[ci + 1]);
                let on = t.point(parsed.coords[ci + 2]);
                edges.cubic_cmd(c1, c2, on);
                ci += 3;
            }
        }
    }
    edges.close();
    if edges.points.len() < 3 {
        return Ok(Vec::new());
    }
    Ok(edges.points)
}

/// Rasterize one contour fragment into an existing 8-bit indexed glyph buffer,
/// OR-composing with whatever is already there via the even-odd XOR rule.
///
/// `buffer` is `pitch * height` bytes, row-major, cells holding `0xFF` background,
/// `0xFE` foreground, or a color-map index.
pub fn rasterize_into(
    data: &[u8],
    t: &Transform,
    color: u8,
    buffer: &mut [u8],
    pitch: usize,
    height: usize,
) -> Result<()> {
    let width_limit = (pitch as i32) << PREC;
    let height_limit = (height as i32) << PREC;
    let points = build_edges(data, t, width_limit, height_limit)?;
    if points.is_empty() {
        return Ok(());
    }
    let np = points.len();

    for b in 0..height as i32 {
        let a = b << PREC;
        let mut crossings: Vec<i32> = Vec::new();
        for i in 0..np - 1 {
            let p0 = points[i];
            let p1 = points[i + 1];
            let (y0, y1) = (p0.1, p1.1);
            let spans = if y0 <= y1 { a >= y0 && a < y1 } else { a >= y1 && a < y0 };
            if !spans {
                continue;
            }
            let x = if y1 != y0 {
                p0.0 + (a - p0.1) * (p1.0 - p0.0) / (p1.1 - p0.1)
            } else {
                (p0.0 + p1.0) / 2
            };
            let mut xi = x >> PREC;
            if t.italic {
                xi += (height as i32 - b) / ITALIC_DIV;
            }
            crossings.push(xi);
        }
        if crossings.is_empty() {
            continue;
        }
        crossings.sort_unstable();
        if crossings.len() % 2 == 1 && crossings.len() > 1 {
            crossings.pop();
        }
        let row = &mut buffer[b as usize * pitch..(b as usize + 1) * pitch];
        let mut bold_offsets: Option<(i32, i32)> = None;
        let mut pair = crossings.chunks_exact(2);
        for span in &mut pair {
            let (mut l, mut r) = (span[0], span[1]);
            if t.bold_cb != 0 {
                let offsets = *bold_offsets.get_or_insert_with(|| {
                    let probe = l.clamp(0, pitch as i32 - 1) as usize;
                    if row[probe] == 0xFF {
                        (-t.bold_cb, t.bold_cb)
                    } else {
                        (t.bold_cb, -t.bold_cb)
                    }
                });
                l += offsets.0;
                r += offsets.1;
            }
            let l = l.clamp(0, pitch as i32);
            let r = r.clamp(0, pitch as i32);
            for x in l..r {
                let cell = &mut row[x as usize];
                *cell = if *cell == 0xFF { color } else { 0xFF };
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_transform(font_height: u32, render_height: u32) -> Transform {
        Transform {
            xoffs: 0,
            yoffs: 0,
            font_height,
            render_height,
            bold_cb: 0,
            italic: false,
        }
    }

    /// A 4-point square contour: move(0,0) line(8,0) line(8,8) line(0,8), closed
    /// implicitly back to (0,0). Commands packed 2 bits each into one byte.
    fn square_fragment() -> Vec<u8> {
        let mut v = Vec::new();
        v.push(3); // point_count - 1 = 3 -> 4 points, bit5 (0x20) clear
        let cmd_byte = (Cmd::Move as u8) | (1 << 2) | (1 << 4) | (1 << 6);
        v.push(cmd_byte);
        v.push(0);
        v.push(0); // move (0,0)
        v.push(8);
        v.push(0); // line (8,0)
        v.push(8);
        v.push(8); // line (8,8)
        v.push(0);
        v.push(8); // line (0,8)
        v
    }

    #[test]
    fn parses_point_count_and_commands() {
        let data = square_fragment();
        let parsed = parse(&data).unwrap();
        assert_eq!(parsed.commands.len(), 4);
        assert_eq!(parsed.commands[0], Cmd::Move);
        assert_eq!(parsed.coords[1], (8, 0));
    }

    #[test]
    fn fills_square_with_color() {
        let data = square_fragment();
        let t = flat_transform(8, 8);
        let mut buf = vec![0xFFu8; 8 * 8];
        rasterize_into(&data, &t, 5, &mut buf, 8, 8).unwrap();
        // interior rows should have the color index set somewhere
        let any_colored = buf.iter().any(|&c| c == 5);
        assert!(any_colored);
        // corners outside the square must stay background
        assert_eq!(buf[0], 0xFF);
    }

    #[test]
    fn extended_point_count_uses_second_byte() {
        // bit 0x40 set (extension flag), low6 = 1, b1 = 0 -> point_count-1 = 256
        let mut v = vec![0x41u8, 0];
        let cmd_bytes_len = (257 + 3) / 4;
        v.extend(std::iter::repeat(0u8).take(cmd_bytes_len));
        v.extend(std::iter::repeat(0u8).take(257 * 2));
        let parsed = parse(&v).unwrap();
        assert_eq!(parsed.commands.len(), 257);
    }

    #[test]
    fn rejects_truncated_fragment() {
        assert!(parse(&[0x03]).is_err());
    }
}
