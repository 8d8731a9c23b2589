//! # Print Stream Byte Codes
//!
//! The 82143A print stream has no framing beyond a handful of byte ranges:
//!
//! | Range | Meaning |
//! |-------|---------|
//! | 0–127 | Character code, see [`charset`](super::charset) |
//! | 161–183 | Run of `b - 160` spaces |
//! | 162 | Line separator (DTR interface only, otherwise a 2-space run) |
//! | 224 | End of line |
//! | 232 | Right-justify the accumulated line |
//! | anything else | Ignored |

use crate::decoder::Mode;

/// Space-run codes start one above this value
pub const SPACE_RUN_BASE: u8 = 160;

/// Last space-run code (inclusive)
pub const SPACE_RUN_LAST: u8 = 183;

/// Byte the DTR interface sends in place of a discrete end-of-line
pub const DTR_SEPARATOR: u8 = 162;

/// End-of-line sentinel, both interfaces
pub const LINE_END: u8 = 224;

/// Right-justify sentinel
pub const RIGHT_JUSTIFY: u8 = 232;

/// Printer line width in characters
pub const LINE_WIDTH: usize = 24;

/// What a single raw byte asks the decoder to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteCode {
    /// Character code, index into the glyph table
    Glyph(u8),
    /// Append this many spaces
    SpaceRun(usize),
    /// DTR line separator: newline + line complete
    Separator,
    /// End of line
    LineEnd,
    /// Right-justify to [`LINE_WIDTH`]
    RightJustify,
    /// Defined no-op
    Ignored,
}

/// Classify a raw byte under the given interface mode.
pub fn classify(b: u8, mode: Mode) -> ByteCode {
    match b {
        0..=127 => ByteCode::Glyph(b),
        DTR_SEPARATOR if mode.is_dtr() => ByteCode::Separator,
        161..=SPACE_RUN_LAST => ByteCode::SpaceRun(usize::from(b - SPACE_RUN_BASE)),
        LINE_END => ByteCode::LineEnd,
        RIGHT_JUSTIFY => ByteCode::RightJustify,
        _ => ByteCode::Ignored,
    }
}
