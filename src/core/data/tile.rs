use std::error::Error;
use std::fmt;

use crate::core::data::view_window::{ComplexBounds, ViewWindow};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TileLayoutError {
    ZeroTiles { rows: u32, cols: u32 },
}

impl fmt::Display for TileLayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroTiles { rows, cols } => {
                write!(f, "tile layout must have at least one tile: {}x{}", rows, cols)
            }
        }
    }
}

impl Error for TileLayoutError {}

/// How many tile rows and columns the grid is cut into.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TileLayout {
    rows: u32,
    cols: u32,
}

impl TileLayout {
    pub fn new(rows: u32, cols: u32) -> Result<Self, TileLayoutError> {
        if rows == 0 || cols == 0 {
            return Err(TileLayoutError::ZeroTiles { rows, cols });
        }

        Ok(Self { rows, cols })
    }

    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    #[must_use]
    pub fn tile_count(&self) -> u32 {
        self.rows * self.cols
    }
}

impl Default for TileLayout {
    fn default() -> Self {
        Self { rows: 5, cols: 5 }
    }
}

/// A rectangle of pixels in the parent grid, in global pixel indices.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PixelSpan {
    pub x0: u32,
    pub y0: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelSpan {
    #[must_use]
    pub fn full(window: &ViewWindow) -> Self {
        Self {
            x0: 0,
            y0: 0,
            width: window.width(),
            height: window.height(),
        }
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// One independent unit of tiled work.
///
/// `span` addresses the tile's pixels in the parent grid; `bounds` is the
/// linear interpolation of the parent window's complex bounds over that
/// span. Backends map pixels through the parent window itself so that
/// recombined tiles are bit-identical to a one-pass computation; `bounds`
/// describes the tile to progress listeners and logs.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tile {
    pub row: u32,
    pub col: u32,
    pub span: PixelSpan,
    pub bounds: ComplexBounds,
}

/// Cuts the window's pixel grid into `layout` tiles: no overlap, no gaps,
/// the last row/column absorbing any remainder. Layouts larger than the
/// grid collapse to one tile per pixel row/column.
#[must_use]
pub fn partition(window: &ViewWindow, layout: TileLayout) -> Vec<Tile> {
    let rows = layout.rows().min(window.height());
    let cols = layout.cols().min(window.width());

    let base_w = window.width() / cols;
    let base_h = window.height() / rows;

    let parent = window.bounds();
    let span_x = parent.xmax - parent.xmin;
    let span_y = parent.ymax - parent.ymin;
    let w = f64::from(window.width());
    let h = f64::from(window.height());

    let mut tiles = Vec::with_capacity(rows as usize * cols as usize);
    for row in 0..rows {
        for col in 0..cols {
            let x0 = col * base_w;
            let y0 = row * base_h;
            let width = if col == cols - 1 {
                window.width() - x0
            } else {
                base_w
            };
            let height = if row == rows - 1 {
                window.height() - y0
            } else {
                base_h
            };

            let bounds = ComplexBounds {
                xmin: parent.xmin + span_x * f64::from(x0) / w,
                xmax: parent.xmin + span_x * f64::from(x0 + width) / w,
                ymin: parent.ymin + span_y * f64::from(y0) / h,
                ymax: parent.ymin + span_y * f64::from(y0 + height) / h,
            };

            tiles.push(Tile {
                row,
                col,
                span: PixelSpan {
                    x0,
                    y0,
                    width,
                    height,
                },
                bounds,
            });
        }
    }

    tiles
}
