//! # glyphreel-render
//!
//! Converts decoded frames to terminal glyphs.
//!
//! Features:
//! - ASCII, ASCII-without-space and block character ramps
//! - Optional 24-bit colour escape sequences
//! - Aspect-preserving fit to the terminal, with optional live resizing

pub mod charset;
pub mod glyph;
pub mod terminal;

pub use charset::ramp;
pub use glyph::GlyphConverter;
pub use terminal::{CrosstermSize, Geometry, TerminalSize};
