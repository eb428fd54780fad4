//! Abstract raster I/O used by the block reducers and the point sampler.
//!
//! Bands are 1-based, as in GDAL. Blocks read as `f64` regardless of the
//! storage type; derived output is written as `f32`.

use crate::chunking::Block;
use crate::error::{RasterError, Result};
use crate::geotransform::GeoTransform;
use ndarray::Array2;

#[derive(Debug, Clone, PartialEq)]
pub struct BandInfo {
    pub block_size: (usize, usize),
    pub data_type: String,
    pub color_interpretation: String,
    pub nodata: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub cols: usize,
    pub rows: usize,
    pub geotransform: GeoTransform,
    pub projection: String,
    pub driver: String,
    pub bands: Vec<BandInfo>,
}

impl RasterInfo {
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn pixel_count(&self) -> usize {
        self.cols * self.rows
    }

    /// Natural tiling of the raster: the block size of its first band.
    pub fn block_size(&self) -> Option<(usize, usize)> {
        self.bands.first().map(|b| b.block_size)
    }

    pub fn band(&self, band: usize) -> Result<&BandInfo> {
        if band == 0 || band > self.bands.len() {
            return Err(RasterError::BandOutOfRange {
                band,
                count: self.bands.len(),
            });
        }
        Ok(&self.bands[band - 1])
    }

    pub fn check_block(&self, block: &Block) -> Result<()> {
        if block.fits_within(self.cols, self.rows) {
            Ok(())
        } else {
            Err(RasterError::BlockOutOfBounds(
                block.xoff,
                block.yoff,
                block.xsize,
                block.ysize,
            ))
        }
    }
}

/// Band statistics as stored in raster metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

pub trait RasterSource {
    fn info(&self) -> &RasterInfo;

    /// Samples of `band` inside `block`, shaped `(ysize, xsize)`.
    fn read_block(&self, band: usize, block: &Block) -> Result<Array2<f64>>;
}

pub trait RasterSink {
    /// `(cols, rows)` of the writable grid.
    fn grid(&self) -> (usize, usize);

    fn write_block(&mut self, band: usize, block: &Block, data: &Array2<f32>) -> Result<()>;

    fn set_no_data_value(&mut self, band: usize, value: f64) -> Result<()>;

    /// Compute min/max/mean/stddev of `band`, ignoring its no-data value,
    /// and store them with the raster's metadata. `None` when every pixel is no-data.
    fn compute_statistics(&mut self, band: usize) -> Result<Option<PixelStatistics>>;

    fn set_geo_transform(&mut self, gt: &GeoTransform) -> Result<()>;

    fn set_projection(&mut self, wkt: &str) -> Result<()>;

    fn build_overviews(&mut self, levels: &[i32]) -> Result<()>;
}

/// One band of a source, named explicitly so formulas never depend on
/// an assumed band order.
#[derive(Clone, Copy)]
pub struct BandRef<'a> {
    pub source: &'a dyn RasterSource,
    pub band: usize,
}

impl<'a> BandRef<'a> {
    pub fn new(source: &'a dyn RasterSource, band: usize) -> Result<Self> {
        source.info().band(band)?;
        Ok(Self { source, band })
    }

    pub fn read(&self, block: &Block) -> Result<Array2<f64>> {
        self.source.read_block(self.band, block)
    }

    pub fn grid(&self) -> (usize, usize) {
        let info = self.source.info();
        (info.cols, info.rows)
    }
}

/// Checks that `data` has the shape `block` describes.
pub(crate) fn check_shape<T>(block: &Block, data: &Array2<T>) -> Result<()> {
    if data.dim() != block.shape() {
        return Err(RasterError::BlockShapeMismatch {
            xoff: block.xoff,
            yoff: block.yoff,
            expected: block.shape(),
            found: data.dim(),
        });
    }
    Ok(())
}
