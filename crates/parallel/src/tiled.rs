//! Tiled processing for large rasters
//!
//! Windows start at multiples of `tile - overlap` along each axis, rows
//! outer and columns inner, and are clipped to the grid. Neighbouring
//! windows share `overlap` pixels; no merging of overlapping results is done.

use crate::strategy::{ParallelStrategy, ProcessingMode};
use roofarea_core::raster::{Raster, RasterElement, Window};
use roofarea_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tile dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    pub width: usize,
    pub height: usize,
}

impl TileSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

impl From<usize> for TileSize {
    fn from(size: usize) -> Self {
        Self::new(size, size)
    }
}

impl From<(usize, usize)> for TileSize {
    fn from((width, height): (usize, usize)) -> Self {
        Self::new(width, height)
    }
}

/// Restartable iterator over the windows of a grid
#[derive(Debug, Clone)]
pub struct WindowIter {
    width: usize,
    height: usize,
    tile: TileSize,
    step_x: usize,
    step_y: usize,
    col: usize,
    row: usize,
}

impl WindowIter {
    /// Tile dimensions used by this iterator
    pub fn tile(&self) -> TileSize {
        self.tile
    }
}

impl Iterator for WindowIter {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.row >= self.height || self.width == 0 {
            return None;
        }

        let window = Window::new(
            self.col,
            self.row,
            self.tile.width.min(self.width - self.col),
            self.tile.height.min(self.height - self.row),
        );

        self.col += self.step_x;
        if self.col >= self.width {
            self.col = 0;
            self.row += self.step_y;
        }

        Some(window)
    }
}

/// Windows covering a `width × height` grid with the given tile size and
/// overlap.
///
/// # Errors
/// [`Error::InvalidParameter`] when a tile dimension is zero or the overlap
/// is not smaller than both tile dimensions.
pub fn iter_windows(
    width: usize,
    height: usize,
    tile_size: impl Into<TileSize>,
    overlap: usize,
) -> Result<WindowIter> {
    let tile = tile_size.into();
    if tile.width == 0 || tile.height == 0 {
        return Err(Error::InvalidParameter {
            name: "tile_size",
            value: format!("{}x{}", tile.width, tile.height),
            reason: "tile dimensions must be positive".into(),
        });
    }
    if overlap >= tile.width || overlap >= tile.height {
        return Err(Error::InvalidParameter {
            name: "overlap",
            value: overlap.to_string(),
            reason: "overlap must be smaller than tile dimensions".into(),
        });
    }

    Ok(WindowIter {
        width,
        height,
        tile,
        step_x: tile.width - overlap,
        step_y: tile.height - overlap,
        col: 0,
        row: 0,
    })
}

/// Processor applying a function to every window of a raster
#[derive(Debug, Clone)]
pub struct TiledProcessor {
    tile_size: TileSize,
    overlap: usize,
    mode: ProcessingMode,
}

impl TiledProcessor {
    pub fn new(tile_size: impl Into<TileSize>, overlap: usize) -> Self {
        Self {
            tile_size: tile_size.into(),
            overlap,
            mode: ProcessingMode::default(),
        }
    }

    /// Select sequential or parallel execution
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Windows this processor would visit on `raster`
    pub fn windows<T: RasterElement>(&self, raster: &Raster<T>) -> Result<WindowIter> {
        iter_windows(raster.cols(), raster.rows(), self.tile_size, self.overlap)
    }

    /// Extract each window of `raster` and apply `f` to it.
    ///
    /// Windows are copied out inside the worker that processes them, so at
    /// most one tile buffer per worker is alive at a time. Each tile keeps
    /// the raster transform shifted to the window origin. Results come back
    /// in window order.
    pub fn map_windows<T, U, F>(&self, raster: &Raster<T>, f: F) -> Result<Vec<U>>
    where
        T: RasterElement,
        U: Send,
        F: Fn(&Window, &Raster<T>) -> U + Sync + Send,
    {
        let windows: Vec<Window> = self.windows(raster)?.collect();

        self.mode
            .map_ordered(windows, |window| {
                let tile = raster.window(&window)?;
                Ok(f(&window, &tile))
            })?
            .into_iter()
            .collect()
    }
}
