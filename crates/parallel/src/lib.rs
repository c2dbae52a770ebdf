//! # Roof Area Parallel
//!
//! Tiling for large rasters:
//! - Overlapping window iteration that never materialises the raster
//! - Per-window processing, sequential or on rayon workers

pub mod strategy;
pub mod tiled;

pub use strategy::{ParallelStrategy, ProcessingMode};
pub use tiled::{iter_windows, TileSize, TiledProcessor, WindowIter};
