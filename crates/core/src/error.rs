//! Error types for roof area operations

use thiserror::Error;

/// Main error type for roof area operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} is missing a CRS definition")]
    MissingCrs(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("No grouping key: expected a non-null 'building_id' or 'tile_id' column")]
    MissingGroupKey,

    #[error("No building footprints: {0}")]
    NoFootprints(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Broad classification of an [`Error`], used by callers that react to the
/// category rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid settings, missing CRS, missing grouping key
    Configuration,
    /// A domain precondition was not met (no footprints, shape mismatch)
    Precondition,
    /// The requested path is permanently unavailable
    Unsupported,
    /// Reading or writing files failed
    Io,
    /// Malformed or out-of-range data
    Data,
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidParameter { .. }
            | Error::MissingCrs(_)
            | Error::MissingGroupKey
            | Error::Projection(_) => ErrorKind::Configuration,
            Error::NoFootprints(_) | Error::SizeMismatch { .. } => ErrorKind::Precondition,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::Io(_) | Error::Tiff(_) | Error::GeoJson(_) => ErrorKind::Io,
            _ => ErrorKind::Data,
        }
    }
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Tiff(e.to_string())
    }
}

impl From<geojson::Error> for Error {
    fn from(e: geojson::Error) -> Self {
        Error::GeoJson(e.to_string())
    }
}

/// Result type alias for roof area operations
pub type Result<T> = std::result::Result<T, Error>;
