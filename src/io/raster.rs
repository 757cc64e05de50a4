use crate::types::{
    BandArray, ClassifiedRaster, GeoTransform, RasterMetadata, TerraError, TerraResult,
    INVALID_CLASS,
};
use gdal::raster::{Buffer, RasterCreationOption};
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::path::Path;

/// Reader for single raster bands
pub struct BandReader;

impl BandReader {
    /// Read the first band of a raster file plus its geospatial metadata.
    ///
    /// Multi-band source files contribute only their first band; callers
    /// that want more bands pass one path per band. Values equal to the
    /// band's declared nodata are normalized to NaN so that one missing-value
    /// convention covers both float and integer sources.
    pub fn read_first_band<P: AsRef<Path>>(path: P) -> TerraResult<(BandArray, RasterMetadata)> {
        log::debug!("Reading band 1 from: {}", path.as_ref().display());

        let dataset = Dataset::open(path.as_ref())?;
        let (width, height) = dataset.raster_size();
        let geo_transform = dataset.geo_transform()?;
        let projection = dataset.projection();

        let rasterband = dataset.rasterband(1)?;
        let nodata = rasterband.no_data_value();
        let band_data =
            rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

        let mut pixels = Array2::from_shape_vec((height, width), band_data.data)
            .map_err(|e| TerraError::Processing(format!("Failed to reshape band data: {}", e)))?;

        if let Some(nd) = nodata {
            let nd = nd as f32;
            pixels.mapv_inplace(|v| if v == nd { f32::NAN } else { v });
        }

        let metadata = RasterMetadata {
            width,
            height,
            geo_transform: GeoTransform::from_gdal(&geo_transform),
            projection,
            nodata,
        };

        Ok((pixels, metadata))
    }
}

/// Writer for classified rasters
pub struct ClassifiedWriter;

impl ClassifiedWriter {
    /// Write a classified raster as a single-band, LZW-compressed Int16
    /// GeoTIFF carrying the reference geotransform and projection.
    ///
    /// The invalid-pixel sentinel is declared as the band's nodata value so
    /// downstream GIS tools treat those pixels as missing.
    pub fn write<P: AsRef<Path>>(raster: &ClassifiedRaster, path: P) -> TerraResult<()> {
        let (rows, cols) = raster.classes.dim();
        log::info!(
            "Writing classified raster ({}x{}) to: {}",
            rows,
            cols,
            path.as_ref().display()
        );

        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let options = [RasterCreationOption {
            key: "COMPRESS",
            value: "LZW",
        }];
        let mut dataset = driver.create_with_band_type_with_options::<i16, _>(
            path.as_ref(),
            cols as isize,
            rows as isize,
            1,
            &options,
        )?;

        dataset.set_geo_transform(&raster.metadata.geo_transform.to_gdal())?;
        if !raster.metadata.projection.is_empty() {
            dataset.set_projection(&raster.metadata.projection)?;
        }

        let mut band = dataset.rasterband(1)?;
        band.set_no_data_value(Some(INVALID_CLASS as f64))?;

        let data: Vec<i16> = raster.classes.iter().copied().collect();
        let buffer = Buffer::new((cols, rows), data);
        band.write((0, 0), (cols, rows), &buffer)?;

        Ok(())
    }
}
