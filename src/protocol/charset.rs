//! # HP 82143A Character Set
//!
//! Maps the printer's 7-bit character codes to Unicode glyphs.
//!
//! Codes 32–126 are mostly ASCII. The exceptions are the calculator's own
//! symbols: `↑` replaces `^` at 94, and `π`, `→`, `Σ`, `├` occupy 123 and
//! 125–127. Codes 0–31 carry Greek letters, accented Latin capitals and a few
//! math symbols instead of control characters.
//!
//! The table order *is* the protocol. Entries must never be reordered, added
//! or removed.

use tracing::warn;

use crate::error::Hp41PrintError;

/// Number of entries in the glyph table
pub const GLYPH_COUNT: usize = 128;

/// Marker glyph printed after the line number of a label (`LBL`) line.
pub const LABEL_MARKER: char = '♦';

/// Byte value to glyph, indexed by the raw code.
pub const GLYPHS: [char; GLYPH_COUNT] = [
    // 0x00–0x0F
    '♦', '¤', 'ж', '←', 'α', 'β', 'Γ', '↓', 'Δ', 'σ', '♦', 'λ', 'µ', 'д', 'τ', 'Φ',
    // 0x10–0x1F
    'Θ', 'Ω', 'δ', 'Å', 'å', 'Ä', 'ä', 'Ö', 'ö', 'Ü', 'ü', 'Æ', 'æ', '≠', '£', '▒',
    // 0x20–0x2F
    ' ', '!', '"', '#', '$', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/',
    // 0x30–0x3F
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?',
    // 0x40–0x4F
    '@', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O',
    // 0x50–0x5F
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '[', '\\', ']', '↑', '_',
    // 0x60–0x6F
    '`', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o',
    // 0x70–0x7F
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'π', '|', '→', 'Σ', '├',
];

/// Look up the glyph for a character code.
///
/// ## Errors
///
/// Returns [`Hp41PrintError::GlyphIndexOutOfRange`] for any index outside
/// `0..128`. Callers in the decoding path treat this as "emit nothing".
pub fn lookup(index: usize) -> Result<char, Hp41PrintError> {
    GLYPHS
        .get(index)
        .copied()
        .ok_or(Hp41PrintError::GlyphIndexOutOfRange(index))
}

/// Check the table at startup.
///
/// The array type already pins the length; this also rejects control
/// characters, which would corrupt the transcript.
pub fn validate() -> Result<(), Hp41PrintError> {
    if GLYPHS.len() != GLYPH_COUNT {
        return Err(Hp41PrintError::Config(format!(
            "glyph table has {} entries, expected {}",
            GLYPHS.len(),
            GLYPH_COUNT
        )));
    }
    if let Some(pos) = GLYPHS.iter().position(|c| c.is_control()) {
        return Err(Hp41PrintError::Config(format!(
            "glyph table entry {} is a control character",
            pos
        )));
    }
    Ok(())
}

/// Encode a string as printer character codes.
///
/// The inverse of [`lookup`]. Where a glyph appears twice in the table (`♦`)
/// the lower code wins. Characters with no code are replaced with `?`.
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        match glyph_code(ch) {
            Some(code) => out.push(code),
            None => {
                warn!(
                    "charset: unmapped character '{}' (U+{:04X}), replacing with '?'",
                    ch, ch as u32
                );
                out.push(b'?');
            }
        }
    }
    out
}

/// Map a glyph back to its character code.
pub fn glyph_code(ch: char) -> Option<u8> {
    GLYPHS.iter().position(|&g| g == ch).map(|i| i as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_valid() {
        assert!(validate().is_ok());
    }

    #[test]
    fn test_printable_ascii_range() {
        for code in 32u8..=126 {
            if matches!(code, 94 | 123 | 125 | 126) {
                continue;
            }
            assert_eq!(lookup(code as usize).unwrap(), code as char, "code {}", code);
        }
    }

    #[test]
    fn test_calculator_symbols() {
        assert_eq!(lookup(0).unwrap(), '♦');
        assert_eq!(lookup(10).unwrap(), '♦');
        assert_eq!(lookup(12).unwrap(), 'µ');
        assert_eq!(lookup(29).unwrap(), '≠');
        assert_eq!(lookup(94).unwrap(), '↑');
        assert_eq!(lookup(123).unwrap(), 'π');
        assert_eq!(lookup(126).unwrap(), 'Σ');
        assert_eq!(lookup(127).unwrap(), '├');
    }

    #[test]
    fn test_escape_sensitive_entries() {
        assert_eq!(lookup(34).unwrap(), '"');
        assert_eq!(lookup(92).unwrap(), '\\');
    }

    #[test]
    fn test_lookup_out_of_range() {
        assert!(matches!(
            lookup(128),
            Err(Hp41PrintError::GlyphIndexOutOfRange(128))
        ));
        assert!(lookup(255).is_err());
        assert!(lookup(usize::MAX).is_err());
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(encode("PRP TEST"), b"PRP TEST".to_vec());
        assert_eq!(encode("Σ+"), vec![126, 43]);
        assert_eq!(encode("X↑2"), vec![88, 94, 50]);
    }

    #[test]
    fn test_encode_duplicate_glyph_uses_first_code() {
        assert_eq!(encode("♦"), vec![0]);
    }

    #[test]
    fn test_unmapped_char_becomes_question_mark() {
        assert_eq!(encode("^"), vec![b'?']);
        assert_eq!(encode("★"), vec![b'?']);
    }
}
