//! # roofarea-core
//!
//! Core types, traits and I/O for roof area inference and evaluation.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type
//! - `Mask`: Boolean grid aligned to a raster
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`: Coordinate Reference System handling
//! - `reproject`: point, bounding box and geometry reprojection
//! - `vector`: features and collections backed by `geo-types`
//! - I/O for GeoTIFF rasters and GeoJSON vectors

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod reproject;
pub mod vector;

pub use crs::{IntoCrs, CRS};
pub use error::{Error, ErrorKind, Result};
pub use raster::{GeoTransform, GridSpec, Mask, Raster, RasterElement, Window};
pub use reproject::BBox;
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{IntoCrs, CRS};
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::raster::{GeoTransform, GridSpec, Mask, Raster, RasterElement, Window};
    pub use crate::reproject::BBox;
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// A named raster operation with typed input, output and parameters.
///
/// Implementors are stateless; everything a run needs is in `Input` and
/// `Params`.
pub trait Algorithm {
    type Input;
    type Output;
    type Params: Default;
    type Error: std::error::Error;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// One-line summary of what the operation computes
    fn description(&self) -> &'static str;

    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Run with `Params::default()`
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
