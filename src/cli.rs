use crate::sample::SampleStrategy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "raster-sampler")]
#[command(about = "Raster band statistics, NDVI, and point sampling, processed block by block")]
#[command(version)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print dimensions, georeferencing and band layout
    Info {
        /// Input raster
        #[arg(value_name = "RASTER")]
        raster: PathBuf,
    },

    /// Per-band sum, mean and non-zero mean
    Stats {
        /// Input raster
        #[arg(value_name = "RASTER")]
        raster: PathBuf,

        /// Block size as WxH or N (default: storage block size)
        #[arg(long, value_name = "WxH", value_parser = parse_block_size)]
        block_size: Option<(usize, usize)>,
    },

    /// Write a single-band Float32 NDVI raster
    Ndvi {
        /// Input multi-band raster
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output raster
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Red band (1-based)
        #[arg(long, default_value_t = 2)]
        red: usize,

        /// Near-infrared band (1-based)
        #[arg(long, default_value_t = 3)]
        nir: usize,

        /// Value written where NIR + red is zero (must lie outside [-1, 1])
        #[arg(long, default_value_t = -99.0, allow_negative_numbers = true)]
        nodata: f32,

        /// Output GDAL driver (default: the input's driver)
        #[arg(long, value_name = "NAME")]
        driver: Option<String>,

        /// Compression (DEFLATE, LZW, ZSTD, PACKBITS, NONE)
        #[arg(long)]
        compression: Option<String>,

        /// Overview levels; pass an empty string to skip overviews
        #[arg(long, value_name = "LEVELS", default_value = "2,4,8,16,32,64,128", value_parser = parse_levels)]
        overviews: Levels,

        /// Block size as WxH or N (default: storage block size)
        #[arg(long, value_name = "WxH", value_parser = parse_block_size)]
        block_size: Option<(usize, usize)>,
    },

    /// Pixel values at point sites read from a vector source
    Sample {
        /// Input raster
        #[arg(value_name = "RASTER")]
        raster: PathBuf,

        /// Point vector source (e.g. a shapefile)
        #[arg(value_name = "SITES")]
        sites: PathBuf,

        /// Comma-separated 1-based bands
        #[arg(long, default_value = "1,2,3", value_delimiter = ',')]
        bands: Vec<usize>,

        /// per-pixel or whole-band
        #[arg(long, default_value = "per-pixel")]
        strategy: SampleStrategy,

        /// Layer index in the vector source
        #[arg(long, default_value_t = 0)]
        layer: usize,
    },
}

/// Overview decimation factors.
#[derive(Debug, Clone, PartialEq)]
pub struct Levels(pub Vec<i32>);

pub fn parse_block_size(s: &str) -> Result<(usize, usize), String> {
    let parse = |v: &str| {
        v.trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid block size '{}': {}", s, e))
    };

    let (width, height) = match s.split_once(['x', 'X']) {
        Some((w, h)) => (parse(w)?, parse(h)?),
        None => {
            let n = parse(s)?;
            (n, n)
        }
    };
    if width == 0 || height == 0 {
        return Err(format!("block size '{}' must be positive", s));
    }
    Ok((width, height))
}

pub fn parse_levels(s: &str) -> Result<Levels, String> {
    if s.trim().is_empty() {
        return Ok(Levels(Vec::new()));
    }
    s.split(',')
        .map(|v| {
            v.trim()
                .parse::<i32>()
                .map_err(|e| format!("invalid overview level '{}': {}", v, e))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Levels)
}
