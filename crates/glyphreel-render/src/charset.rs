//! Character ramps ordered from darkest to brightest.

use glyphreel_core::Charset;

const ASCII: &[char] = &[
    ' ', '.', '\'', '`', '^', '"', ',', ':', ';', 'I', 'l', '!', 'i', '>', '<', '~', '+', '_', '-',
    '?', ']', '[', '}', '{', '1', ')', '(', '|', '\\', '/', 't', 'f', 'j', 'r', 'x', 'n', 'u', 'v',
    'c', 'z', 'X', 'Y', 'U', 'J', 'C', 'L', 'Q', '0', 'O', 'Z', 'm', 'w', 'q', 'p', 'd', 'b', 'k',
    'h', 'a', 'o', '*', '#', 'M', 'W', '&', '8', '%', 'B', '$', '@',
];

const BLOCK: &[char] = &[' ', '░', '▒', '▓', '█'];

/// The glyph ramp for `charset`.
pub fn ramp(charset: Charset) -> &'static [char] {
    match charset {
        Charset::Ascii => ASCII,
        Charset::AsciiNoSpace => &ASCII[1..],
        Charset::Block => BLOCK,
    }
}

/// Map a brightness in `0.0..=255.0` to a glyph of `ramp`.
pub fn glyph_for(ramp: &[char], brightness: f64) -> char {
    let last = ramp.len().saturating_sub(1);
    let index = (brightness.clamp(0.0, 255.0) / 255.0 * last as f64).round() as usize;
    ramp.get(index.min(last)).copied().unwrap_or(' ')
}
