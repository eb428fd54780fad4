//! In-memory raster backing both [`RasterSource`] and [`RasterSink`].
//!
//! Used for synthetic inputs and for capturing derived output without a
//! GDAL driver. Every write is recorded so that callers can check the
//! order in which blocks arrived.

use crate::chunking::Block;
use crate::error::{RasterError, Result};
use crate::geotransform::GeoTransform;
use crate::source::{check_shape, BandInfo, PixelStatistics, RasterInfo, RasterSink, RasterSource};
use log::debug;
use ndarray::{s, Array2};

#[derive(Debug, Clone)]
pub struct MemRaster {
    info: RasterInfo,
    bands: Vec<Array2<f64>>,
    written: Vec<(usize, Block)>,
    overviews: Vec<i32>,
    statistics: Vec<Option<PixelStatistics>>,
}

impl MemRaster {
    /// Builds a raster from band arrays shaped `(rows, cols)`.
    pub fn from_bands(bands: Vec<Array2<f64>>, block_size: (usize, usize)) -> Result<Self> {
        let (rows, cols) = bands.first().map(|b| b.dim()).unwrap_or((0, 0));
        if rows == 0 || cols == 0 {
            return Err(RasterError::InvalidDimensions(cols, rows));
        }
        if let Some(other) = bands.iter().find(|b| b.dim() != (rows, cols)) {
            let (found_rows, found_cols) = other.dim();
            return Err(RasterError::GridMismatch {
                expected: (cols, rows),
                found: (found_cols, found_rows),
            });
        }
        if block_size.0 == 0 || block_size.1 == 0 {
            return Err(RasterError::InvalidBlockSize(block_size.0, block_size.1));
        }

        let band_info = BandInfo {
            block_size,
            data_type: "Float64".to_string(),
            color_interpretation: "Undefined".to_string(),
            nodata: None,
        };
        let info = RasterInfo {
            cols,
            rows,
            geotransform: GeoTransform::default(),
            projection: String::new(),
            driver: "MEM".to_string(),
            bands: vec![band_info; bands.len()],
        };

        let statistics = vec![None; bands.len()];
        Ok(Self {
            info,
            bands,
            written: Vec::new(),
            overviews: Vec::new(),
            statistics,
        })
    }

    /// Zero-filled raster, typically an output target.
    pub fn zeros(cols: usize, rows: usize, band_count: usize, block_size: (usize, usize)) -> Result<Self> {
        let bands = (0..band_count.max(1))
            .map(|_| Array2::<f64>::zeros((rows, cols)))
            .collect();
        Self::from_bands(bands, block_size)
    }

    pub fn with_geotransform(mut self, gt: GeoTransform) -> Self {
        self.info.geotransform = gt;
        self
    }

    pub fn with_projection(mut self, wkt: &str) -> Self {
        self.info.projection = wkt.to_string();
        self
    }

    pub fn band_data(&self, band: usize) -> Result<&Array2<f64>> {
        self.info.band(band)?;
        Ok(&self.bands[band - 1])
    }

    pub fn no_data_value(&self, band: usize) -> Result<Option<f64>> {
        Ok(self.info.band(band)?.nodata)
    }

    /// `(band, block)` pairs in the order they were written.
    pub fn written_blocks(&self) -> &[(usize, Block)] {
        &self.written
    }

    pub fn overview_levels(&self) -> &[i32] {
        &self.overviews
    }

    /// Statistics stored by the last `compute_statistics` call on `band`.
    pub fn statistics(&self, band: usize) -> Result<Option<PixelStatistics>> {
        self.info.band(band)?;
        Ok(self.statistics[band - 1])
    }
}

impl RasterSource for MemRaster {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_block(&self, band: usize, block: &Block) -> Result<Array2<f64>> {
        self.info.band(band)?;
        self.info.check_block(block)?;

        let data = &self.bands[band - 1];
        Ok(data
            .slice(s![block.yoff..block.y_end(), block.xoff..block.x_end()])
            .to_owned())
    }
}

impl RasterSink for MemRaster {
    fn grid(&self) -> (usize, usize) {
        (self.info.cols, self.info.rows)
    }

    fn write_block(&mut self, band: usize, block: &Block, data: &Array2<f32>) -> Result<()> {
        self.info.band(band)?;
        self.info.check_block(block)?;
        check_shape(block, data)?;

        self.bands[band - 1]
            .slice_mut(s![block.yoff..block.y_end(), block.xoff..block.x_end()])
            .assign(&data.mapv(f64::from));
        self.written.push((band, *block));

        debug!(
            "MEM: wrote band {} at ({},{}) size {}x{}",
            band, block.xoff, block.yoff, block.xsize, block.ysize
        );
        Ok(())
    }

    fn set_no_data_value(&mut self, band: usize, value: f64) -> Result<()> {
        self.info.band(band)?;
        self.info.bands[band - 1].nodata = Some(value);
        Ok(())
    }

    fn compute_statistics(&mut self, band: usize) -> Result<Option<PixelStatistics>> {
        let nodata = self.info.band(band)?.nodata;
        let valid: Vec<f64> = self.bands[band - 1]
            .iter()
            .copied()
            .filter(|&v| !v.is_nan() && Some(v) != nodata)
            .collect();

        let stats = if valid.is_empty() {
            None
        } else {
            let n = valid.len() as f64;
            let mean = valid.iter().sum::<f64>() / n;
            let variance = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            Some(PixelStatistics {
                min: valid.iter().copied().fold(f64::INFINITY, f64::min),
                max: valid.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                mean,
                std_dev: variance.sqrt(),
            })
        };
        self.statistics[band - 1] = stats;
        Ok(stats)
    }

    fn set_geo_transform(&mut self, gt: &GeoTransform) -> Result<()> {
        self.info.geotransform = *gt;
        Ok(())
    }

    fn set_projection(&mut self, wkt: &str) -> Result<()> {
        self.info.projection = wkt.to_string();
        Ok(())
    }

    fn build_overviews(&mut self, levels: &[i32]) -> Result<()> {
        self.overviews = levels.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_read_block_slices_band() {
        let band = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        let raster = MemRaster::from_bands(vec![band], (2, 2)).unwrap();

        let block = raster.read_block(1, &Block::new(1, 1, 2, 2)).unwrap();
        assert_eq!(block, arr2(&[[5.0, 6.0], [8.0, 9.0]]));
        assert_eq!(raster.info().block_size(), Some((2, 2)));
    }

    #[test]
    fn test_read_rejects_bad_band_and_block() {
        let raster = MemRaster::zeros(3, 3, 1, (3, 1)).unwrap();
        assert!(matches!(
            raster.read_block(2, &Block::new(0, 0, 1, 1)),
            Err(RasterError::BandOutOfRange { band: 2, count: 1 })
        ));
        assert!(matches!(
            raster.read_block(0, &Block::new(0, 0, 1, 1)),
            Err(RasterError::BandOutOfRange { band: 0, .. })
        ));
        assert!(matches!(
            raster.read_block(1, &Block::new(2, 2, 2, 1)),
            Err(RasterError::BlockOutOfBounds(2, 2, 2, 1))
        ));
    }

    #[test]
    fn test_write_block_records_order() {
        let mut raster = MemRaster::zeros(4, 2, 1, (2, 2)).unwrap();
        let data = Array2::<f32>::from_elem((2, 2), 1.5);

        raster.write_block(1, &Block::new(2, 0, 2, 2), &data).unwrap();
        raster.write_block(1, &Block::new(0, 0, 2, 2), &data).unwrap();

        let written: Vec<_> = raster.written_blocks().iter().map(|(_, b)| b.xoff).collect();
        assert_eq!(written, vec![2, 0]);
        assert!(raster.band_data(1).unwrap().iter().all(|&v| v == 1.5));
    }

    #[test]
    fn test_write_shape_mismatch() {
        let mut raster = MemRaster::zeros(4, 4, 1, (2, 2)).unwrap();
        let data = Array2::<f32>::zeros((1, 2));
        assert!(matches!(
            raster.write_block(1, &Block::new(0, 0, 2, 2), &data),
            Err(RasterError::BlockShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_statistics_skip_nodata() {
        let band = arr2(&[[-99.0, 1.0], [3.0, -99.0]]);
        let mut raster = MemRaster::from_bands(vec![band], (2, 2)).unwrap();
        raster.set_no_data_value(1, -99.0).unwrap();

        let stats = raster.compute_statistics(1).unwrap().unwrap();
        assert_eq!((stats.min, stats.max, stats.mean, stats.std_dev), (1.0, 3.0, 2.0, 1.0));
        assert_eq!(raster.statistics(1).unwrap(), Some(stats));
    }

    #[test]
    fn test_statistics_all_nodata() {
        let mut raster = MemRaster::zeros(2, 2, 1, (2, 2)).unwrap();
        raster.set_no_data_value(1, 0.0).unwrap();
        assert_eq!(raster.compute_statistics(1).unwrap(), None);
    }

    #[test]
    fn test_mismatched_bands_rejected() {
        let a = Array2::<f64>::zeros((2, 2));
        let b = Array2::<f64>::zeros((3, 2));
        assert!(matches!(
            MemRaster::from_bands(vec![a, b], (1, 1)),
            Err(RasterError::GridMismatch { .. })
        ));
    }
}
