//! I/O operations for reading and writing geospatial data

mod geojson;
mod native;

pub use self::geojson::{parse_geojson, read_geojson};
pub use native::{
    read_geotiff, read_geotiff_bands, read_geotiff_from_buffer, write_geotiff, write_mask,
    write_mask_to_buffer,
};
