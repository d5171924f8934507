//! Terminal geometry detection.

use glyphreel_core::{Error, Result};

/// Character grid and, when the terminal reports it, pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub cols: u32,
    pub rows: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl Geometry {
    /// Characters per source pixel horizontally: the user override if
    /// given, otherwise cell height / cell width, otherwise 2.
    pub fn cell_ratio(&self, forced: Option<u32>) -> u32 {
        if let Some(ratio) = forced {
            return ratio.max(1);
        }
        if self.pixel_width == 0 || self.pixel_height == 0 || self.cols == 0 || self.rows == 0 {
            return 2;
        }
        let cell_height = f64::from(self.pixel_height) / f64::from(self.rows);
        let cell_width = f64::from(self.pixel_width) / f64::from(self.cols);
        ((cell_height / cell_width).round() as u32).max(1)
    }
}

/// Something that can measure the output terminal.
pub trait TerminalSize: Send {
    fn geometry(&self) -> Result<Geometry>;
}

/// Measures the controlling terminal through crossterm.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrosstermSize;

impl TerminalSize for CrosstermSize {
    fn geometry(&self) -> Result<Geometry> {
        if let Ok(size) = crossterm::terminal::window_size() {
            return Ok(Geometry {
                cols: u32::from(size.columns),
                rows: u32::from(size.rows),
                pixel_width: u32::from(size.width),
                pixel_height: u32::from(size.height),
            });
        }

        // Pixel size is not available everywhere; the grid size is enough
        let (cols, rows) = crossterm::terminal::size()
            .map_err(|e| Error::Terminal(format!("Failed to get terminal size: {e}")))?;
        Ok(Geometry {
            cols: u32::from(cols),
            rows: u32::from(rows),
            ..Geometry::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_ratio() {
        let geometry = Geometry {
            cols: 100,
            rows: 50,
            pixel_width: 800,
            pixel_height: 800,
        };
        assert_eq!(geometry.cell_ratio(None), 2);
        assert_eq!(geometry.cell_ratio(Some(3)), 3);
        assert_eq!(Geometry::default().cell_ratio(None), 2);
    }
}
