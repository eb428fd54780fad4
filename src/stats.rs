use crate::chunking::BlockGrid;
use crate::error::{RasterError, Result};
use crate::source::RasterSource;
use log::{debug, info};
use ndarray::Array2;
use std::fmt;

/// Running per-band totals for the mean / non-zero mean reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct BandStatistics {
    pub band: usize,
    pub sum: f64,
    pub pixel_count: u64,
    pub nonzero_count: u64,
}

impl BandStatistics {
    pub fn new(band: usize) -> Self {
        Self {
            band,
            sum: 0.0,
            pixel_count: 0,
            nonzero_count: 0,
        }
    }

    /// Adds one block. "Non-zero" means strictly greater than zero.
    pub fn accumulate(&mut self, block: &Array2<f64>) {
        self.sum += block.sum();
        self.pixel_count += block.len() as u64;
        self.nonzero_count += block.iter().filter(|&&v| v > 0.0).count() as u64;
    }

    pub fn mean(&self) -> Result<f64> {
        if self.pixel_count == 0 {
            return Err(RasterError::NoValidPixels(format!("band {} is empty", self.band)));
        }
        Ok(self.sum / self.pixel_count as f64)
    }

    pub fn nonzero_mean(&self) -> Result<f64> {
        if self.nonzero_count == 0 {
            return Err(RasterError::NoValidPixels(format!(
                "band {} has no non-zero pixels",
                self.band
            )));
        }
        Ok(self.sum / self.nonzero_count as f64)
    }
}

impl fmt::Display for BandStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Band {}: Sum={:.0}  Pixels={}  NonZeroPixels={}",
            self.band, self.sum, self.pixel_count, self.nonzero_count
        )?;
        match self.mean() {
            Ok(mean) => write!(f, "  Mean={:.2}", mean)?,
            Err(_) => write!(f, "  Mean=n/a")?,
        }
        match self.nonzero_mean() {
            Ok(mean) => write!(f, "  NonZeroMean={:.2}", mean),
            Err(_) => write!(f, "  NonZeroMean=n/a"),
        }
    }
}

/// Sum and non-zero count of every band, reading all bands one block at a time.
pub fn band_statistics(
    source: &dyn RasterSource,
    block_size: Option<(usize, usize)>,
) -> Result<Vec<BandStatistics>> {
    let raster = source.info();
    if raster.band_count() == 0 {
        return Ok(Vec::new());
    }

    let block_size = match block_size {
        Some(size) => size,
        None => raster.band(1)?.block_size,
    };
    let grid = BlockGrid::new(raster.cols, raster.rows, block_size)?;
    info!(
        "Computing statistics for {} bands in {} blocks",
        raster.band_count(),
        grid.total_blocks
    );

    let mut stats: Vec<BandStatistics> = (1..=raster.band_count()).map(BandStatistics::new).collect();
    for block in grid.iter() {
        for band_stats in stats.iter_mut() {
            let data = source.read_block(band_stats.band, &block)?;
            band_stats.accumulate(&data);
        }
        debug!("Accumulated block ({},{})", block.xoff, block.yoff);
    }

    Ok(stats)
}
