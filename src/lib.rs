// Library exports for testing and reuse

pub mod chunking;
pub mod cli;
pub mod crs;
pub mod error;
pub mod geotransform;
pub mod io;
pub mod memory;
pub mod ndvi;
pub mod output;
pub mod sample;
pub mod source;
pub mod stats;

// Re-export commonly used types
pub use chunking::{Block, BlockGrid};
pub use error::{RasterError, Result};
pub use geotransform::{to_pixel_offset, to_world_coord, GeoTransform, PixelOffset};
pub use io::{read_sites, GdalRaster};
pub use memory::MemRaster;
pub use ndvi::{compute_ndvi, NdviParams, NdviSummary};
pub use sample::{sample_sites, SampleStrategy, Site, SiteSample};
pub use source::{BandRef, PixelStatistics, RasterInfo, RasterSink, RasterSource};
pub use stats::{band_statistics, BandStatistics};
