//! Frame to glyph conversion.

use std::fmt::Write as _;

use glyphreel_core::{DisplayFrame, FrameRenderer, RawVideoFrame, Result, VideoConfig};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::{debug, info};

use crate::charset::{glyph_for, ramp};
use crate::terminal::{CrosstermSize, Geometry, TerminalSize};

const ANSI_RESET: &str = "\x1b[0m";

/// Renders frames as glyphs sized to the terminal.
pub struct GlyphConverter<T = CrosstermSize> {
    terminal: T,
    ramp: &'static [char],
    color: bool,
    forced_ratio: Option<u32>,
    max_width: Option<u32>,
    max_height: Option<u32>,
    auto_resize: bool,
    geometry: Option<Geometry>,
    ratio: u32,
}

impl GlyphConverter<CrosstermSize> {
    pub fn new(config: &VideoConfig) -> Self {
        Self::with_terminal(config, CrosstermSize)
    }
}

impl<T: TerminalSize> GlyphConverter<T> {
    pub fn with_terminal(config: &VideoConfig, terminal: T) -> Self {
        Self {
            terminal,
            ramp: ramp(config.charset),
            color: config.color,
            forced_ratio: config.ratio,
            max_width: config.width,
            max_height: config.height,
            auto_resize: config.auto_resize,
            geometry: None,
            ratio: 2,
        }
    }

    /// Re-measure the terminal. Returns true if the grid changed.
    fn refresh_geometry(&mut self) -> Result<bool> {
        let geometry = self.terminal.geometry()?;
        let changed = self
            .geometry
            .map_or(true, |old| old.cols != geometry.cols || old.rows != geometry.rows);

        if changed {
            info!("Terminal is {}x{} characters", geometry.cols, geometry.rows);
        }
        self.ratio = geometry.cell_ratio(self.forced_ratio);
        self.geometry = Some(geometry);
        Ok(changed)
    }

    /// Size in source pixels the frame is scaled to before conversion.
    fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let geometry = self.geometry.unwrap_or_default();
        let cols = self.max_width.map_or(geometry.cols, |w| w.min(geometry.cols));
        let rows = self.max_height.map_or(geometry.rows, |h| h.min(geometry.rows));
        fit_within(width, height, (cols / self.ratio).max(1), rows.max(1))
    }

    fn to_glyphs(&self, image: &RgbaImage) -> String {
        let ratio = self.ratio as usize;
        let (width, height) = image.dimensions();
        let per_pixel = if self.color { ratio + 20 } else { ratio };
        let mut out = String::with_capacity(height as usize * (width as usize * per_pixel + 1));

        for (y, row) in image.rows().enumerate() {
            if y > 0 {
                out.push('\n');
            }
            let mut current: Option<[u8; 3]> = None;
            for pixel in row {
                if self.color {
                    let rgb = [pixel[0], pixel[1], pixel[2]];
                    if current != Some(rgb) {
                        let _ = write!(out, "\x1b[38;2;{};{};{}m", rgb[0], rgb[1], rgb[2]);
                        current = Some(rgb);
                    }
                }
                let glyph = glyph_for(self.ramp, brightness(*pixel));
                out.extend(std::iter::repeat(glyph).take(ratio));
            }
            if current.is_some() {
                out.push_str(ANSI_RESET);
            }
        }
        out
    }
}

impl<T: TerminalSize> FrameRenderer for GlyphConverter<T> {
    fn render(&mut self, frame: RawVideoFrame) -> Result<DisplayFrame> {
        let needs_clear = if self.geometry.is_none() || self.auto_resize {
            self.refresh_geometry()?
        } else {
            false
        };

        let (width, height) = self.target_size(frame.width(), frame.height());
        let image = frame.into_image();
        let scaled = if (width, height) == image.dimensions() {
            image
        } else {
            imageops::resize(&image, width, height, FilterType::Nearest)
        };

        if needs_clear {
            debug!("Rendering at {}x{} pixels, ratio {}", width, height, self.ratio);
        }
        Ok(DisplayFrame::new(self.to_glyphs(&scaled), needs_clear))
    }
}

/// Downscale `width` x `height` to fit within the bounds, keeping the
/// aspect ratio. Images that already fit are left alone.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let scale = (f64::from(max_width) / f64::from(width))
        .min(f64::from(max_height) / f64::from(height));
    let fitted_w = ((f64::from(width) * scale).round() as u32).clamp(1, max_width);
    let fitted_h = ((f64::from(height) * scale).round() as u32).clamp(1, max_height);
    (fitted_w, fitted_h)
}

/// Mean of the colour channels, weighted by alpha.
fn brightness(pixel: Rgba<u8>) -> f64 {
    let [r, g, b, a] = pixel.0;
    let mean = (f64::from(r) + f64::from(g) + f64::from(b)) / 3.0;
    mean * f64::from(a) / 255.0
}
