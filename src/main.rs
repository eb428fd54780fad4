use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use std::path::Path;
use std::time::Instant;

use raster_sampler::cli::{Args, Command, Levels};
use raster_sampler::crs;
use raster_sampler::ndvi::{compute_ndvi, NdviParams};
use raster_sampler::output::{validate_overview_levels, OutputOptions};
use raster_sampler::{
    band_statistics, read_sites, sample_sites, BandRef, GdalRaster, RasterError, RasterSource, Result,
    SampleStrategy,
};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let start = Instant::now();
    match args.command {
        Command::Info { raster } => print_info(&raster)?,
        Command::Stats { raster, block_size } => print_stats(&raster, block_size)?,
        Command::Ndvi {
            input,
            output,
            red,
            nir,
            nodata,
            driver,
            compression,
            overviews: Levels(overviews),
            block_size,
        } => {
            let params = NdviParams {
                nodata,
                block_size,
                overviews,
            };
            let options = OutputOptions {
                driver,
                compression,
                ..OutputOptions::default()
            };
            run_ndvi(&input, &output, red, nir, &params, &options)?
        }
        Command::Sample {
            raster,
            sites,
            bands,
            strategy,
            layer,
        } => run_sample(&raster, &sites, &bands, strategy, layer)?,
    }

    info!("time: {:.3} sec", start.elapsed().as_secs_f64());
    Ok(())
}

fn print_info(path: &Path) -> Result<()> {
    let raster = GdalRaster::open(path)?;
    let meta = raster.info();

    println!("\nRaster file: {}", path.display());
    println!(
        "\nRows x Columns x Bands: {} x {} x {}",
        meta.rows,
        meta.cols,
        meta.band_count()
    );
    println!("\n{}", meta.geotransform);
    println!("Projection: {}", crs::describe_projection(&meta.projection));
    println!();
    for (i, band) in meta.bands.iter().enumerate() {
        println!(
            "Band {}: Block={}x{}  Type={}  ColorInterp={}",
            i + 1,
            band.block_size.0,
            band.block_size.1,
            band.data_type,
            band.color_interpretation
        );
    }
    Ok(())
}

fn print_stats(path: &Path, block_size: Option<(usize, usize)>) -> Result<()> {
    let raster = GdalRaster::open(path)?;
    let stats = band_statistics(&raster, block_size)?;

    println!();
    for band_stats in &stats {
        println!("{}", band_stats);
    }
    Ok(())
}

fn run_ndvi(
    input: &Path,
    output: &Path,
    red: usize,
    nir: usize,
    params: &NdviParams,
    options: &OutputOptions,
) -> Result<()> {
    validate_overview_levels(&params.overviews)?;
    params.validate()?;

    let source = GdalRaster::open(input)?;
    let red_band = BandRef::new(&source, red)?;
    let nir_band = BandRef::new(&source, nir)?;

    let mut target = GdalRaster::create(output, source.info(), 1, options)?;
    let summary = compute_ndvi(red_band, nir_band, &mut target, params)?;

    println!(
        "\nNonZeros/Pixels: {}/{}  ({:.0}%)",
        summary.valid_count,
        summary.pixel_count,
        summary.valid_percent()
    );
    match summary.mean() {
        Ok(mean) => println!("\nNDVI mean: {:.2}", mean),
        Err(RasterError::NoValidPixels(reason)) => println!("\nNDVI mean: n/a ({})", reason),
        Err(e) => return Err(e),
    }
    Ok(())
}

fn run_sample(
    raster_path: &Path,
    sites_path: &Path,
    bands: &[usize],
    strategy: SampleStrategy,
    layer: usize,
) -> Result<()> {
    let raster = GdalRaster::open(raster_path)?;
    let site_layer = read_sites(sites_path, layer)?;

    if !crs::same_crs(&raster.info().projection, site_layer.spatial_ref.as_ref()) {
        warn!("Continuing without reprojection");
    }

    let samples = sample_sites(&raster, &site_layer.sites, bands, strategy)?;

    println!();
    for sample in &samples {
        println!("{}", sample);
    }
    Ok(())
}
