//! Roof mask generation
//!
//! - **gradient**: blur + Sobel magnitude threshold over image intensity
//! - **rasterize**: polygon interiors burned onto a reference grid
//! - **footprint**: restriction of a mask to building footprints

mod footprint;
mod gradient;
mod rasterize;

pub use footprint::constrain_to_footprints;
pub use gradient::{blur, gradient_magnitude, gradient_mask, intensity, GradientMask, GradientParams};
pub use rasterize::{burn_polygon, rasterize_polygons};
