use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Array shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("Can't open raster {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: gdal::errors::GdalError,
    },

    #[error("Can't open vector source {path}: {source}")]
    VectorOpenFailed {
        path: PathBuf,
        source: gdal::errors::GdalError,
    },

    #[error("Raster has invalid dimensions: {0}x{1}")]
    InvalidDimensions(usize, usize),

    #[error("Invalid block size: {0}x{1} (both sides must be positive)")]
    InvalidBlockSize(usize, usize),

    #[error("Band {band} out of range (raster has {count} bands)")]
    BandOutOfRange { band: usize, count: usize },

    #[error("Raster grids differ: expected {expected:?}, found {found:?}")]
    GridMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Block shape mismatch at ({xoff},{yoff}): expected {expected:?}, found {found:?}")]
    BlockShapeMismatch {
        xoff: usize,
        yoff: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Block at ({0},{1}) size {2}x{3} lies outside the raster")]
    BlockOutOfBounds(usize, usize, usize, usize),

    #[error("Invalid nodata value: {0} (must lie outside the NDVI range [-1, 1])")]
    InvalidNodata(f32),

    #[error("No valid pixels: {0}")]
    NoValidPixels(String),

    #[error("Geotransform is rotated (rx={0}, ry={1}); only axis-aligned rasters are supported")]
    RotatedGeoTransform(f64, f64),

    #[error("Feature {0} has no point geometry")]
    MissingGeometry(u64),

    #[error("Invalid compression type: {0}")]
    InvalidCompression(String),

    #[error("Invalid overview level: {0} (must be >= 2)")]
    InvalidOverviewLevel(i32),
}

pub type Result<T> = std::result::Result<T, RasterError>;
