use crate::error::{RasterError, Result};
use log::debug;

pub const DEFAULT_RESAMPLING: &str = "AVERAGE";

/// How the derived raster is created on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputOptions {
    /// GDAL short driver name; `None` reuses the input raster's driver.
    pub driver: Option<String>,
    pub compression: Option<String>,
    pub overview_resampling: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            driver: None,
            compression: None,
            overview_resampling: DEFAULT_RESAMPLING.to_string(),
        }
    }
}

impl OutputOptions {
    /// Driver to create the output with, falling back to the input's.
    pub fn driver_or<'a>(&'a self, input_driver: &'a str) -> &'a str {
        self.driver.as_deref().unwrap_or(input_driver)
    }
}

/// Validate compression type
pub fn validate_compression(compression: &str) -> Result<()> {
    let valid_types = ["DEFLATE", "LZW", "ZSTD", "PACKBITS", "NONE"];
    if !valid_types.contains(&compression) {
        return Err(RasterError::InvalidCompression(compression.to_string()));
    }
    Ok(())
}

/// Overview factors must be at least 2.
pub fn validate_overview_levels(levels: &[i32]) -> Result<()> {
    match levels.iter().find(|&&level| level < 2) {
        Some(&level) => Err(RasterError::InvalidOverviewLevel(level)),
        None => Ok(()),
    }
}

/// Driver-specific creation options.
pub fn creation_options(driver: &str, compression: Option<&str>) -> Result<Vec<String>> {
    let mut options = Vec::new();
    match driver {
        "GTiff" => {
            if let Some(compression) = compression {
                validate_compression(compression)?;
                options.push(format!("COMPRESS={}", compression));
            }
            options.push("TILED=YES".to_string());
            options.push("BIGTIFF=IF_SAFER".to_string());
        }
        "HFA" => {
            // HFA only knows run-length compression on/off
            if compression.is_some_and(|c| c != "NONE") {
                options.push("COMPRESSED=YES".to_string());
            }
        }
        _ => {}
    }

    debug!("Creation options for {}: {:?}", driver, options);
    Ok(options)
}

/// Config options GDAL needs before building overviews for `driver`.
pub fn overview_config(driver: &str) -> Option<(&'static str, &'static str)> {
    // HFA writes .rrd side-car overviews instead of embedding them
    if driver == "HFA" {
        Some(("HFA_USE_RRD", "YES"))
    } else {
        None
    }
}
