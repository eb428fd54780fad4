use crate::chunking::Block;
use crate::error::{RasterError, Result};
use crate::geotransform::GeoTransform;
use crate::output::{creation_options, overview_config, OutputOptions};
use crate::sample::Site;
use crate::source::{check_shape, BandInfo, PixelStatistics, RasterInfo, RasterSink, RasterSource};
use gdal::cpl::CslStringList;
use gdal::spatial_ref::SpatialRef;
use gdal::vector::LayerAccess;
use gdal::{Dataset, DriverManager};
use log::{debug, info, warn};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// GDAL dataset read and written through the block interfaces.
pub struct GdalRaster {
    path: PathBuf,
    dataset: Dataset,
    info: RasterInfo,
    overview_resampling: String,
}

impl GdalRaster {
    /// Open an existing raster read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening raster: {}", path.display());
        let dataset = Dataset::open(path).map_err(|source| RasterError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_dataset(path, dataset)
    }

    /// Wrap an already open dataset, e.g. one created by the MEM driver.
    pub fn from_dataset(path: impl AsRef<Path>, dataset: Dataset) -> Result<Self> {
        let info = extract_info(&dataset)?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            dataset,
            info,
            overview_resampling: OutputOptions::default().overview_resampling,
        })
    }

    /// Create a Float32 raster on the same grid as `template`.
    pub fn create(
        path: impl AsRef<Path>,
        template: &RasterInfo,
        band_count: usize,
        options: &OutputOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let driver_name = options.driver_or(&template.driver);
        info!("Creating output raster: {} ({})", path.display(), driver_name);

        let driver = DriverManager::get_driver_by_name(driver_name)?;
        let create_options = creation_options(driver_name, options.compression.as_deref())?;

        let dataset = if create_options.is_empty() {
            driver.create_with_band_type::<f32, _>(path, template.cols, template.rows, band_count)?
        } else {
            let mut gdal_options = CslStringList::new();
            for opt in &create_options {
                gdal_options.add_string(opt)?;
            }
            driver.create_with_band_type_with_options::<f32, _>(
                path,
                template.cols,
                template.rows,
                band_count,
                &gdal_options,
            )?
        };

        let mut raster = Self::from_dataset(path, dataset)?;
        raster.overview_resampling = options.overview_resampling.clone();
        Ok(raster)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

impl RasterSource for GdalRaster {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_block(&self, band: usize, block: &Block) -> Result<Array2<f64>> {
        self.info.band(band)?;
        self.info.check_block(block)?;
        let rasterband = self.dataset.rasterband(band)?;

        let buffer = rasterband.read_as::<f64>(
            (block.xoff as isize, block.yoff as isize),
            (block.xsize, block.ysize),
            (block.xsize, block.ysize),
            None,
        )?;

        let data_vec: Vec<f64> = buffer.into_iter().collect();
        let data = Array2::from_shape_vec(block.shape(), data_vec)?;
        Ok(data)
    }
}

impl RasterSink for GdalRaster {
    fn grid(&self) -> (usize, usize) {
        (self.info.cols, self.info.rows)
    }

    fn write_block(&mut self, band: usize, block: &Block, data: &Array2<f32>) -> Result<()> {
        self.info.band(band)?;
        self.info.check_block(block)?;
        check_shape(block, data)?;

        let mut raster_band = self.dataset.rasterband(band)?;
        let values: Vec<f32> = data.iter().copied().collect();
        let mut buffer = gdal::raster::Buffer::new((block.xsize, block.ysize), values);

        raster_band.write(
            (block.xoff as isize, block.yoff as isize),
            (block.xsize, block.ysize),
            &mut buffer,
        )?;

        debug!(
            "Wrote block to band {} at ({},{}) size {}x{}",
            band, block.xoff, block.yoff, block.xsize, block.ysize
        );
        Ok(())
    }

    fn set_no_data_value(&mut self, band: usize, value: f64) -> Result<()> {
        self.info.band(band)?;
        let mut raster_band = self.dataset.rasterband(band)?;
        raster_band.set_no_data_value(Some(value))?;
        self.info.bands[band - 1].nodata = Some(value);
        Ok(())
    }

    fn compute_statistics(&mut self, band: usize) -> Result<Option<PixelStatistics>> {
        self.info.band(band)?;
        let raster_band = self.dataset.rasterband(band)?;
        // GDAL fails rather than warns when no pixel survives the no-data filter.
        match raster_band.get_statistics(true, false) {
            Ok(stats) => Ok(stats.map(|s| PixelStatistics {
                min: s.min,
                max: s.max,
                mean: s.mean,
                std_dev: s.std_dev,
            })),
            Err(e) => {
                warn!(
                    "No statistics for band {} of {}: {}",
                    band,
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn set_geo_transform(&mut self, gt: &GeoTransform) -> Result<()> {
        self.dataset.set_geo_transform(&gt.to_gdal())?;
        self.info.geotransform = *gt;
        Ok(())
    }

    fn set_projection(&mut self, wkt: &str) -> Result<()> {
        if wkt.is_empty() {
            debug!("No projection to set on {}", self.path.display());
            return Ok(());
        }
        self.dataset.set_projection(wkt)?;
        self.info.projection = wkt.to_string();
        Ok(())
    }

    fn build_overviews(&mut self, levels: &[i32]) -> Result<()> {
        if let Some((key, value)) = overview_config(&self.info.driver) {
            gdal::config::set_config_option(key, value)?;
        }
        self.dataset
            .build_overviews(&self.overview_resampling, levels, &[])?;
        info!("Overviews {:?} built for {}", levels, self.path.display());
        Ok(())
    }
}

/// Dimensions, georeferencing and per-band layout of an open dataset.
pub fn extract_info(dataset: &Dataset) -> Result<RasterInfo> {
    let (cols, rows) = dataset.raster_size();
    if cols == 0 || rows == 0 {
        return Err(RasterError::InvalidDimensions(cols, rows));
    }

    // Datasets without georeferencing get GDAL's identity transform
    let geotransform = match dataset.geo_transform() {
        Ok(gt) => GeoTransform::from_gdal(&gt),
        Err(e) => {
            debug!("No geotransform ({}), using identity", e);
            GeoTransform::default()
        }
    };

    let band_count = dataset.raster_count() as usize;
    let mut bands = Vec::with_capacity(band_count);
    for index in 1..=band_count {
        let rasterband = dataset.rasterband(index)?;
        bands.push(BandInfo {
            block_size: rasterband.block_size(),
            data_type: format!("{:?}", rasterband.band_type()),
            color_interpretation: format!("{:?}", rasterband.color_interpretation()),
            nodata: rasterband.no_data_value(),
        });
    }

    Ok(RasterInfo {
        cols,
        rows,
        geotransform,
        projection: dataset.projection(),
        driver: dataset.driver().short_name(),
        bands,
    })
}

/// Point features of a vector source.
pub struct SiteLayer {
    pub sites: Vec<Site>,
    pub spatial_ref: Option<SpatialRef>,
}

/// Read point sites from layer `layer_index` of a vector source (e.g. a shapefile).
/// Every non-null attribute is kept as text.
pub fn read_sites(path: impl AsRef<Path>, layer_index: usize) -> Result<SiteLayer> {
    let path = path.as_ref();
    info!("Opening vector source: {}", path.display());
    let dataset = Dataset::open(path).map_err(|source| RasterError::VectorOpenFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let mut layer = dataset.layer(layer_index)?;
    let spatial_ref = layer.spatial_ref();

    let mut sites = Vec::new();
    for (index, feature) in layer.features().enumerate() {
        let id = feature.fid().unwrap_or(index as u64);
        let geometry = feature.geometry().ok_or(RasterError::MissingGeometry(id))?;
        let (x, y, _) = geometry.get_point(0);

        let mut attributes = BTreeMap::new();
        for (name, value) in feature.fields() {
            if let Some(text) = value.and_then(|v| v.into_string()) {
                attributes.insert(name, text);
            }
        }

        sites.push(Site { id, x, y, attributes });
    }

    info!("Read {} sites from {}", sites.len(), path.display());
    Ok(SiteLayer { sites, spatial_ref })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndvi::{compute_ndvi, NdviParams};
    use crate::source::BandRef;

    fn mem_raster(cols: usize, rows: usize, bands: usize) -> GdalRaster {
        let driver = DriverManager::get_driver_by_name("MEM").unwrap();
        let dataset = driver
            .create_with_band_type::<f32, _>("", cols, rows, bands)
            .unwrap();
        GdalRaster::from_dataset("mem", dataset).unwrap()
    }

    #[test]
    fn test_block_write_read_round_trip() {
        let mut raster = mem_raster(5, 3, 1);
        let block = Block::new(1, 1, 3, 2);
        let data = Array2::from_shape_fn((2, 3), |(r, c)| (r * 3 + c) as f32);

        raster.write_block(1, &block, &data).unwrap();
        let read = raster.read_block(1, &block).unwrap();
        assert_eq!(read, data.mapv(f64::from));

        let untouched = raster.read_block(1, &Block::new(0, 0, 1, 1)).unwrap();
        assert_eq!(untouched[[0, 0]], 0.0);
    }

    #[test]
    fn test_info_from_mem_dataset() {
        let raster = mem_raster(7, 4, 2);
        let info = raster.info();
        assert_eq!((info.cols, info.rows), (7, 4));
        assert_eq!(info.band_count(), 2);
        assert_eq!(info.driver, "MEM");
    }

    #[test]
    fn test_ndvi_through_gdal() {
        let mut source = mem_raster(4, 4, 2);
        let red = Array2::from_shape_fn((4, 4), |(r, c)| if r < 2 && c >= 2 { 0.0f32 } else { 1.0 });
        let nir = red.mapv(|v| v * 3.0);
        source.write_block(1, &Block::new(0, 0, 4, 4), &red).unwrap();
        source.write_block(2, &Block::new(0, 0, 4, 4), &nir).unwrap();

        let mut out = mem_raster(4, 4, 1);
        let params = NdviParams {
            block_size: Some((2, 2)),
            overviews: Vec::new(),
            ..NdviParams::default()
        };
        let summary = compute_ndvi(
            BandRef::new(&source, 1).unwrap(),
            BandRef::new(&source, 2).unwrap(),
            &mut out,
            &params,
        )
        .unwrap();

        assert_eq!(summary.valid_count, 12);
        assert_eq!(out.info().bands[0].nodata, Some(-99.0));
        let ndvi = out.read_block(1, &Block::new(0, 0, 4, 4)).unwrap();
        assert_eq!(ndvi[[0, 3]], -99.0);
        assert_eq!(ndvi[[3, 0]], 0.5);

        let stats = out.compute_statistics(1).unwrap().unwrap();
        assert_eq!((stats.min, stats.max), (0.5, 0.5));
    }

    #[test]
    fn test_open_missing_raster_reports_path() {
        let err = GdalRaster::open("/nonexistent/aster.img").err().unwrap();
        match err {
            RasterError::OpenFailed { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/aster.img"))
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_open_missing_vector_reports_path() {
        assert!(matches!(
            read_sites("/nonexistent/sites.shp", 0),
            Err(RasterError::VectorOpenFailed { .. })
        ));
    }

    #[test]
    fn test_create_gtiff_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let template = mem_raster(8, 6, 1).info().clone();
        let options = OutputOptions {
            driver: Some("GTiff".to_string()),
            compression: Some("DEFLATE".to_string()),
            ..OutputOptions::default()
        };

        let path = dir.path().join("ndvi.tif");
        let mut out = GdalRaster::create(&path, &template, 1, &options).unwrap();
        out.write_block(1, &Block::new(0, 0, 8, 6), &Array2::from_elem((6, 8), 0.25f32))
            .unwrap();
        out.set_no_data_value(1, -99.0).unwrap();
        drop(out);

        let reopened = GdalRaster::open(&path).unwrap();
        assert_eq!(reopened.info().driver, "GTiff");
        assert_eq!(reopened.info().bands[0].nodata, Some(-99.0));
        let data = reopened.read_block(1, &Block::new(2, 2, 2, 2)).unwrap();
        assert!(data.iter().all(|&v| v == 0.25));
    }
}
