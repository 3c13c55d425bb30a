//! Renderer error kinds.
//!
//! Port of the error codes in `ssfn.h` (`SSFN_ERR_*`). The numeric values are kept
//! identical to the C header for compatibility with the original's textual table,
//! even though `Result<T, Error>` makes the `SSFN_OK == 0` discriminant redundant on
//! the Rust side.

use std::fmt;

/// Everything that can go wrong in the renderer. `Ok` is represented by `Result::Ok`,
/// not a variant here — see `code()` for the compat-table numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Allocation failure (capacity growth, in practice).
    Alloc,
    /// Malformed SSFN2 image: bad magic, out-of-range offsets, truncated fragment.
    BadFile,
    /// No font face matches the current selection.
    NoFace,
    /// Null/empty/out-of-range argument.
    InvInp,
    /// Style mask has bits outside the low 13.
    BadStyle,
    /// Size outside `[8, 192]`.
    BadSize,
    /// Glyph (or kerning info) not found.
    NoGlyph,
}

impl Error {
    /// The original C header's numeric error code (`SSFN_ERR_*`), used only for
    /// compatibility checks against `original_source/ssfn.h`.
    pub fn code(self) -> i32 {
        match self {
            Error::Alloc => -1,
            Error::BadFile => -2,
            Error::NoFace => -3,
            Error::InvInp => -4,
            Error::BadStyle => -5,
            Error::BadSize => -6,
            Error::NoGlyph => -7,
        }
    }

    /// The error string, spelled identically to `ssfn_errstr[]` in the original.
    pub fn as_str(self) -> &'static str {
        match self {
            Error::Alloc => "Memory allocation error",
            Error::BadFile => "Bad file format",
            Error::NoFace => "No font face found",
            Error::InvInp => "Invalid input value",
            Error::BadStyle => "Invalid style",
            Error::BadSize => "Invalid size",
            Error::NoGlyph => "Glyph not found",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_original_header() {
        assert_eq!(Error::Alloc.code(), -1);
        assert_eq!(Error::BadFile.code(), -2);
        assert_eq!(Error::NoFace.code(), -3);
        assert_eq!(Error::InvInp.code(), -4);
        assert_eq!(Error::BadStyle.code(), -5);
        assert_eq!(Error::BadSize.code(), -6);
        assert_eq!(Error::NoGlyph.code(), -7);
    }

    #[test]
    fn strings_match_original_table() {
        assert_eq!(Error::Alloc.as_str(), "Memory allocation error");
        assert_eq!(Error::NoGlyph.as_str(), "Glyph not found");
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(format!("{}", Error::BadSize), Error::BadSize.as_str());
    }
}
