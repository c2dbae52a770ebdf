//! Raster data structures and operations

mod element;
mod geotransform;
mod grid;
mod mask;
mod neighborhood;
mod window;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{GridSpec, Raster, RasterStatistics};
pub use mask::Mask;
pub use window::Window;
