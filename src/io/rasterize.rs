use crate::types::{GeoTransform, TerraError, TerraResult};
use gdal::raster::rasterize;
use gdal::vector::Geometry;
use gdal::DriverManager;
use ndarray::Array2;

/// Rasterize a polygon into a boolean inclusion mask over a raster grid.
///
/// The mask is true where the pixel center falls inside the polygon, which
/// matches how training pixels are selected from field polygons. The
/// geometry must be in the same coordinate system as the grid; the affine
/// transform has to come from the stack the mask will index into, or the
/// mask silently selects the wrong pixels.
pub fn geometry_mask(
    wkt: &str,
    shape: (usize, usize),
    transform: &GeoTransform,
) -> TerraResult<Array2<bool>> {
    let (rows, cols) = shape;
    let geometry = Geometry::from_wkt(wkt)?;

    // Burn the polygon into an in-memory byte grid and read it back.
    let driver = DriverManager::get_driver_by_name("MEM")?;
    let mut dataset =
        driver.create_with_band_type::<u8, _>("", cols as isize, rows as isize, 1)?;
    dataset.set_geo_transform(&transform.to_gdal())?;

    rasterize(&mut dataset, &[1], &[geometry], &[1.0], None)?;

    let burned = dataset
        .rasterband(1)?
        .read_as::<u8>((0, 0), (cols, rows), (cols, rows), None)?;

    let mask = Array2::from_shape_vec((rows, cols), burned.data)
        .map_err(|e| TerraError::Processing(format!("Failed to reshape polygon mask: {}", e)))?
        .mapv(|v| v != 0);

    Ok(mask)
}
