//! Pixel values of raster bands at point sites.

use crate::chunking::Block;
use crate::error::Result;
use crate::geotransform::{to_pixel_offset, PixelOffset};
use crate::source::RasterSource;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A point with its attribute table row.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub attributes: BTreeMap<String, String>,
}

impl Site {
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStrategy {
    /// One 1x1 read per site and band.
    PerPixel,
    /// Read each band once, then index into it.
    WholeBand,
}

impl FromStr for SampleStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "per-pixel" | "pixel" => Ok(SampleStrategy::PerPixel),
            "whole-band" | "band" => Ok(SampleStrategy::WholeBand),
            other => Err(format!("unknown sampling strategy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteSample {
    pub site: Site,
    pub offset: PixelOffset,
    /// One value per requested band; `None` when the site falls outside the raster.
    pub values: Option<Vec<f64>>,
}

impl fmt::Display for SiteSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:2}: {:.4}, {:.4}", self.site.id, self.site.x, self.site.y)?;
        for (name, value) in &self.site.attributes {
            write!(f, "  {}={}", name, value)?;
        }
        match &self.values {
            Some(values) => {
                let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, " = ({})", joined.join(", "))
            }
            None => write!(f, " = outside raster at offset {}", self.offset),
        }
    }
}

/// Samples `bands` at every site. Sites are returned in input order.
pub fn sample_sites(
    source: &dyn RasterSource,
    sites: &[Site],
    bands: &[usize],
    strategy: SampleStrategy,
) -> Result<Vec<SiteSample>> {
    let raster = source.info();
    raster.geotransform.ensure_axis_aligned()?;
    for &band in bands {
        raster.band(band)?;
    }

    let mut samples: Vec<SiteSample> = sites
        .iter()
        .map(|site| {
            let offset = to_pixel_offset((site.x, site.y), &raster.geotransform);
            let inside = offset.is_within(raster.cols, raster.rows);
            if !inside {
                warn!(
                    "Site {} at ({:.4}, {:.4}) maps to offset {} outside the {}x{} raster",
                    site.id, site.x, site.y, offset, raster.cols, raster.rows
                );
            }
            SiteSample {
                site: site.clone(),
                offset,
                values: inside.then(|| Vec::with_capacity(bands.len())),
            }
        })
        .collect();

    info!(
        "Sampling {} sites on {} bands ({:?})",
        sites.len(),
        bands.len(),
        strategy
    );

    for &band in bands {
        match strategy {
            SampleStrategy::PerPixel => {
                for sample in samples.iter_mut() {
                    let Some((col, row)) = sample.offset.checked_index(raster.cols, raster.rows) else {
                        continue;
                    };
                    let data = source.read_block(band, &Block::pixel(col, row))?;
                    if let Some(values) = sample.values.as_mut() {
                        values.push(data[[0, 0]]);
                    }
                }
            }
            SampleStrategy::WholeBand => {
                let data = source.read_block(band, &Block::new(0, 0, raster.cols, raster.rows))?;
                for sample in samples.iter_mut() {
                    let Some((col, row)) = sample.offset.checked_index(raster.cols, raster.rows) else {
                        continue;
                    };
                    if let Some(values) = sample.values.as_mut() {
                        values.push(data[[row, col]]);
                    }
                }
            }
        }
        debug!("Sampled band {}", band);
    }

    Ok(samples)
}
