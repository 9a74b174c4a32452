// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CP857 (OEM Turkish) encoding for slip and thermal printers.
//
// The printers expect single-byte text. ASCII passes through unchanged,
// which keeps control bytes such as CR/LF intact; the upper half maps to the
// CP857 table below. `encode_cp857` is strict and reports the first
// character with no CP857 byte. `encode_or_utf8` is what the printers get:
// unmappable characters become `?`, and only text that CP857 cannot carry at
// all goes out as UTF-8.

use tracing::{instrument, warn};

/// Byte sent in place of a character CP857 has no position for.
pub const SUBSTITUTE: u8 = b'?';

/// Placeholder for the three unassigned CP857 positions (0xD5, 0xE7, 0xF2).
const UNDEFINED: char = '\u{FFFF}';

/// Characters for bytes 0x80..=0xFF.
#[rustfmt::skip]
const CP857_HIGH: [char; 128] = [
    // 0x80
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ı', 'Ä', 'Å',
    // 0x90
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'İ', 'Ö', 'Ü', 'ø', '£', 'Ø', 'Ş', 'ş',
    // 0xA0
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'Ğ', 'ğ', '¿', '®', '¬', '½', '¼', '¡', '«', '»',
    // 0xB0
    '░', '▒', '▓', '│', '┤', 'Á', 'Â', 'À', '©', '╣', '║', '╗', '╝', '¢', '¥', '┐',
    // 0xC0
    '└', '┴', '┬', '├', '─', '┼', 'ã', 'Ã', '╚', '╔', '╩', '╦', '╠', '═', '╬', '¤',
    // 0xD0
    'º', 'ª', 'Ê', 'Ë', 'È', UNDEFINED, 'Í', 'Î', 'Ï', '┘', '┌', '█', '▄', '¦', 'Ì', '▀',
    // 0xE0
    'Ó', 'ß', 'Ô', 'Ò', 'õ', 'Õ', 'µ', UNDEFINED, '×', 'Ú', 'Û', 'Ù', 'ì', 'ÿ', '¯', '´',
    // 0xF0
    '\u{AD}', '±', UNDEFINED, '¾', '¶', '§', '÷', '¸', '°', '¨', '·', '¹', '³', '²', '■', '\u{A0}',
];

/// Byte for a single character, if CP857 has one.
pub fn cp857_byte(c: char) -> Option<u8> {
    if c.is_ascii() {
        return Some(c as u8);
    }
    if c == UNDEFINED {
        return None;
    }
    CP857_HIGH
        .iter()
        .position(|&mapped| mapped == c)
        .map(|idx| 0x80 + idx as u8)
}

/// Encode `text` as CP857.
///
/// Returns the first character that has no CP857 byte on failure.
#[instrument(skip(text), fields(len = text.len()))]
pub fn encode_cp857(text: &str) -> Result<Vec<u8>, char> {
    text.chars().map(|c| cp857_byte(c).ok_or(c)).collect()
}

/// Printer-ready bytes for a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    /// Characters replaced by [`SUBSTITUTE`].
    pub substituted: usize,
    /// `true` when the text was sent as UTF-8 instead of CP857.
    pub utf8_fallback: bool,
}

/// Encode as CP857, substituting `?` for unmappable characters.
///
/// When no non-whitespace character is representable (an all-emoji or CJK
/// note, say) substitution would print nothing but `?`, so the UTF-8 bytes
/// are sent instead.
pub fn encode_or_utf8(text: &str) -> Encoded {
    let mut bytes = Vec::with_capacity(text.len());
    let mut substituted = 0;
    let mut representable = false;

    for c in text.chars() {
        match cp857_byte(c) {
            Some(b) => {
                representable |= !c.is_whitespace();
                bytes.push(b);
            }
            None => {
                substituted += 1;
                bytes.push(SUBSTITUTE);
            }
        }
    }

    if substituted > 0 && !representable {
        warn!(chars = substituted, "text has no CP857 representation, sending UTF-8");
        return Encoded {
            bytes: text.as_bytes().to_vec(),
            substituted: 0,
            utf8_fallback: true,
        };
    }
    if substituted > 0 {
        warn!(chars = substituted, "characters outside CP857 replaced with '?'");
    }
    Encoded {
        bytes,
        substituted,
        utf8_fallback: false,
    }
}
