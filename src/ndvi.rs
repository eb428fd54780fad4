//! Normalized Difference Vegetation Index computed block by block.
//!
//! `ndvi = (nir - red) / (nir + red)`. Pixels whose denominator is zero or
//! not finite (NaN or infinite inputs) are written as the no-data sentinel
//! and excluded from the running statistics.

use crate::chunking::{Block, BlockGrid};
use crate::error::{RasterError, Result};
use crate::source::{BandRef, RasterSink};
use log::{debug, info};
use ndarray::{Array2, Zip};

pub const DEFAULT_NODATA: f32 = -99.0;
pub const DEFAULT_OVERVIEWS: [i32; 7] = [2, 4, 8, 16, 32, 64, 128];

/// Per-pixel result of a two-band ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DerivedSample {
    Value(f64),
    NoData,
}

impl DerivedSample {
    pub fn value_or(self, nodata: f32) -> f32 {
        match self {
            DerivedSample::Value(v) => v as f32,
            DerivedSample::NoData => nodata,
        }
    }
}

fn is_masked(denominator: f64) -> bool {
    denominator == 0.0 || !denominator.is_finite()
}

pub fn ndvi_sample(red: f64, nir: f64) -> DerivedSample {
    let denominator = nir + red;
    if is_masked(denominator) {
        DerivedSample::NoData
    } else {
        DerivedSample::Value((nir - red) / denominator)
    }
}

/// How many pixels of a block had a masked denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMask {
    AllValid,
    Partial { invalid: usize },
    AllInvalid,
}

#[derive(Debug, Clone)]
pub struct NdviBlock {
    pub values: Array2<f32>,
    pub mask: BlockMask,
    pub valid_count: usize,
    pub sum: f64,
}

/// NDVI of one block. `red` and `nir` must have the same shape.
pub fn ndvi_block(red: &Array2<f64>, nir: &Array2<f64>, nodata: f32) -> Result<NdviBlock> {
    if red.dim() != nir.dim() {
        let (red_rows, red_cols) = red.dim();
        let (nir_rows, nir_cols) = nir.dim();
        return Err(RasterError::GridMismatch {
            expected: (red_cols, red_rows),
            found: (nir_cols, nir_rows),
        });
    }

    let total = red.len();
    let invalid = Zip::from(red)
        .and(nir)
        .fold(0usize, |acc, &r, &n| if is_masked(r + n) { acc + 1 } else { acc });

    if total > 0 && invalid == total {
        return Ok(NdviBlock {
            values: Array2::from_elem(red.dim(), nodata),
            mask: BlockMask::AllInvalid,
            valid_count: 0,
            sum: 0.0,
        });
    }

    let mut values = Array2::<f32>::zeros(red.dim());
    let mut sum = 0.0;

    if invalid == 0 {
        Zip::from(&mut values).and(red).and(nir).for_each(|out, &r, &n| {
            let v = (n - r) / (n + r);
            sum += v;
            *out = v as f32;
        });
        return Ok(NdviBlock {
            values,
            mask: BlockMask::AllValid,
            valid_count: total,
            sum,
        });
    }

    Zip::from(&mut values).and(red).and(nir).for_each(|out, &r, &n| {
        let sample = ndvi_sample(r, n);
        if let DerivedSample::Value(v) = sample {
            sum += v;
        }
        *out = sample.value_or(nodata);
    });

    Ok(NdviBlock {
        values,
        mask: BlockMask::Partial { invalid },
        valid_count: total - invalid,
        sum,
    })
}

/// Running totals over a block pass, accumulated in block order.
#[derive(Debug, Clone, Default)]
pub struct NdviReducer {
    sum: f64,
    valid_count: u64,
    pixel_count: u64,
    blocks: usize,
    nodata_blocks: usize,
}

impl NdviReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, block: &NdviBlock) {
        self.blocks += 1;
        self.pixel_count += block.values.len() as u64;
        match block.mask {
            BlockMask::AllInvalid => self.nodata_blocks += 1,
            _ => {
                self.valid_count += block.valid_count as u64;
                self.sum += block.sum;
            }
        }
    }

    pub fn finish(self) -> NdviSummary {
        NdviSummary {
            sum: self.sum,
            valid_count: self.valid_count,
            pixel_count: self.pixel_count,
            blocks: self.blocks,
            nodata_blocks: self.nodata_blocks,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NdviSummary {
    pub sum: f64,
    pub valid_count: u64,
    pub pixel_count: u64,
    pub blocks: usize,
    pub nodata_blocks: usize,
}

impl NdviSummary {
    pub fn mean(&self) -> Result<f64> {
        if self.valid_count == 0 {
            return Err(RasterError::NoValidPixels(format!(
                "all {} pixels have a masked NDVI denominator",
                self.pixel_count
            )));
        }
        Ok(self.sum / self.valid_count as f64)
    }

    /// Share of pixels with a defined NDVI, in percent.
    pub fn valid_percent(&self) -> f64 {
        if self.pixel_count == 0 {
            0.0
        } else {
            100.0 * self.valid_count as f64 / self.pixel_count as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct NdviParams {
    pub nodata: f32,
    /// Overrides the block size reported by the red band's storage.
    pub block_size: Option<(usize, usize)>,
    /// Overview decimation factors built after the last block; empty skips them.
    pub overviews: Vec<i32>,
}

impl NdviParams {
    /// The sentinel must not collide with any NDVI value in [-1, 1].
    pub fn validate(&self) -> Result<()> {
        if (-1.0..=1.0).contains(&self.nodata) {
            return Err(RasterError::InvalidNodata(self.nodata));
        }
        Ok(())
    }
}

impl Default for NdviParams {
    fn default() -> Self {
        Self {
            nodata: DEFAULT_NODATA,
            block_size: None,
            overviews: DEFAULT_OVERVIEWS.to_vec(),
        }
    }
}

/// Streams `red` and `nir` block by block, writes NDVI to band 1 of `sink`
/// in the same order, then finalises the sink (no-data value, georeferencing
/// copied from the red source, overviews).
pub fn compute_ndvi(
    red: BandRef<'_>,
    nir: BandRef<'_>,
    sink: &mut dyn RasterSink,
    params: &NdviParams,
) -> Result<NdviSummary> {
    params.validate()?;

    let (cols, rows) = red.grid();
    if nir.grid() != (cols, rows) {
        return Err(RasterError::GridMismatch {
            expected: (cols, rows),
            found: nir.grid(),
        });
    }
    if sink.grid() != (cols, rows) {
        return Err(RasterError::GridMismatch {
            expected: (cols, rows),
            found: sink.grid(),
        });
    }

    let red_info = red.source.info();
    let block_size = match params.block_size {
        Some(size) => size,
        None => red_info.band(red.band)?.block_size,
    };
    let grid = BlockGrid::new(cols, rows, block_size)?;

    info!(
        "Computing NDVI over {}x{} pixels in {} blocks of {}x{} (red=band {}, nir=band {})",
        cols, rows, grid.total_blocks, block_size.0, block_size.1, red.band, nir.band
    );

    let mut reducer = NdviReducer::new();
    for block in grid.iter() {
        let result = process_block(&red, &nir, &block, params.nodata)?;
        sink.write_block(1, &block, &result.values)?;
        reducer.accumulate(&result);
    }

    sink.set_no_data_value(1, f64::from(params.nodata))?;
    if let Some(stats) = sink.compute_statistics(1)? {
        debug!("Output band statistics: {:?}", stats);
    }
    sink.set_geo_transform(&red_info.geotransform)?;
    sink.set_projection(&red_info.projection)?;
    if !params.overviews.is_empty() {
        info!("Building overviews {:?}", params.overviews);
        sink.build_overviews(&params.overviews)?;
    }

    let summary = reducer.finish();
    info!(
        "NDVI pass done: {}/{} valid pixels, {} all-no-data blocks",
        summary.valid_count, summary.pixel_count, summary.nodata_blocks
    );
    Ok(summary)
}

fn process_block(red: &BandRef<'_>, nir: &BandRef<'_>, block: &Block, nodata: f32) -> Result<NdviBlock> {
    let red_data = red.read(block)?;
    let nir_data = nir.read(block)?;
    let result = ndvi_block(&red_data, &nir_data, nodata)?;

    debug!(
        "Block ({},{}) {}x{}: {:?}, {} valid",
        block.xoff, block.yoff, block.xsize, block.ysize, result.mask, result.valid_count
    );
    Ok(result)
}
