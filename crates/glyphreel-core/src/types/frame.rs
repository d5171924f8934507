//! Video frame types.

use bytes::Bytes;
use image::RgbaImage;

/// A decoded video frame as it leaves the decoder.
///
/// Owned by exactly one stage at a time; the converter consumes it.
#[derive(Debug, Clone)]
pub struct RawVideoFrame {
    image: RgbaImage,
}

impl RawVideoFrame {
    pub const fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Build a frame from tightly packed RGBA bytes.
    ///
    /// Returns `None` if `pixels` is not exactly `width * height * 4` bytes.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, pixels).map(Self::new)
    }

    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A frame rendered to terminal glyphs, ready to be written to the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    /// Glyphs and escape sequences, UTF-8 encoded.
    payload: Bytes,
    /// The terminal geometry changed since the previous frame, so the whole
    /// screen must be cleared before drawing.
    needs_clear: bool,
}

impl DisplayFrame {
    pub fn new(payload: impl Into<Bytes>, needs_clear: bool) -> Self {
        Self {
            payload: payload.into(),
            needs_clear,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub const fn needs_clear(&self) -> bool {
        self.needs_clear
    }
}
